//! 消息通道服务
//!
//! 消息追加、历史分页、已读标记和实时扇出。会话内的投递顺序
//! 就是存储分配的 `seq` 顺序（也即提交顺序），广播层不做重排；
//! `created_at` 只是展示字段，不参与排序。

use std::sync::Arc;

use domain::{
    ConversationId, Message, MessageContent, MessageId, RepositoryError, UserId,
};
use uuid::Uuid;

use crate::broadcaster::{MessageBroadcast, MessageBroadcaster};
use crate::clock::Clock;
use crate::dto::{ConversationDto, MessageDto};
use crate::error::ApplicationError;
use crate::repository::{ConversationRepository, MessageRepository};
use crate::services::notification_service::NotificationService;
use crate::typing::TypingTracker;

#[derive(Debug, Clone)]
pub struct SendMessageRequest {
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
}

pub struct MessageServiceDependencies {
    pub conversations: Arc<dyn ConversationRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub broadcaster: Arc<dyn MessageBroadcaster>,
    pub notifier: Arc<NotificationService>,
    pub typing: Arc<TypingTracker>,
    pub clock: Arc<dyn Clock>,
}

pub struct MessageService {
    conversations: Arc<dyn ConversationRepository>,
    messages: Arc<dyn MessageRepository>,
    broadcaster: Arc<dyn MessageBroadcaster>,
    notifier: Arc<NotificationService>,
    typing: Arc<TypingTracker>,
    clock: Arc<dyn Clock>,
}

impl MessageService {
    pub fn new(deps: MessageServiceDependencies) -> Self {
        Self {
            conversations: deps.conversations,
            messages: deps.messages,
            broadcaster: deps.broadcaster,
            notifier: deps.notifier,
            typing: deps.typing,
            clock: deps.clock,
        }
    }

    /// 发送消息：参与者校验、内容校验、追加存储、未读 +1、实时广播。
    ///
    /// 广播和通知失败都不回滚已存储的消息。
    pub async fn send(&self, request: SendMessageRequest) -> Result<MessageDto, ApplicationError> {
        let conversation_id = ConversationId::from(request.conversation_id);
        let sender = UserId::from(request.sender_id);

        let conversation = self
            .conversations
            .find_by_id(conversation_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let receiver = conversation.other_participant(sender)?;

        let content = MessageContent::parse(request.content)?;
        let message = Message::new(
            MessageId::random(),
            conversation_id,
            sender,
            receiver,
            content,
            self.clock.now(),
        );

        let stored = self.messages.append(message).await?;
        self.conversations
            .increment_unread(conversation_id, receiver)
            .await?;

        if let Err(err) = self
            .broadcaster
            .broadcast(MessageBroadcast {
                conversation_id,
                message: stored.clone(),
            })
            .await
        {
            tracing::warn!(error = %err, %conversation_id, "message broadcast failed");
        }

        self.notifier.notify_message(receiver, sender).await;

        tracing::info!(%conversation_id, %sender, seq = stored.seq, "message sent");
        Ok(MessageDto::from(&stored))
    }

    /// 历史读取：`seq` 升序，seq 游标分页。
    /// 断线重连后客户端带上最后见到的 seq 即可补齐错过的消息。
    pub async fn history(
        &self,
        conversation_id: Uuid,
        requester: Uuid,
        after_seq: Option<i64>,
        limit: u32,
    ) -> Result<Vec<MessageDto>, ApplicationError> {
        let conversation_id = ConversationId::from(conversation_id);
        let conversation = self
            .conversations
            .find_by_id(conversation_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        if !conversation.is_participant(UserId::from(requester)) {
            return Err(domain::DomainError::NotParticipant.into());
        }

        let items = self
            .messages
            .list_page(conversation_id, after_seq, limit)
            .await?;
        Ok(items.iter().map(MessageDto::from).collect())
    }

    /// 把发给 `reader` 的全部未读消息标记为已读并清零未读计数。
    /// 幂等：没有新消息时返回 0。
    pub async fn mark_read(
        &self,
        conversation_id: Uuid,
        reader: Uuid,
    ) -> Result<u64, ApplicationError> {
        let conversation_id = ConversationId::from(conversation_id);
        let reader = UserId::from(reader);

        let conversation = self
            .conversations
            .find_by_id(conversation_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        if !conversation.is_participant(reader) {
            return Err(domain::DomainError::NotParticipant.into());
        }

        let marked = self
            .messages
            .mark_read(conversation_id, reader, self.clock.now())
            .await?;
        self.conversations
            .clear_unread(conversation_id, reader)
            .await?;

        if marked > 0 {
            tracing::info!(%conversation_id, %reader, marked, "messages marked read");
        }
        Ok(marked)
    }

    /// 校验 `user_id` 是会话的参与者。订阅入口在升级连接前调用，
    /// 与发送/历史读取同样的参与者准入。
    pub async fn ensure_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), ApplicationError> {
        let conversation_id = ConversationId::from(conversation_id);
        let conversation = self
            .conversations
            .find_by_id(conversation_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        if !conversation.is_participant(UserId::from(user_id)) {
            return Err(domain::DomainError::NotParticipant.into());
        }
        Ok(())
    }

    /// 更新输入中状态（进程内临时状态）。
    pub async fn set_typing(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        is_typing: bool,
    ) -> Result<(), ApplicationError> {
        let conversation_id = ConversationId::from(conversation_id);
        let user = UserId::from(user_id);

        let conversation = self
            .conversations
            .find_by_id(conversation_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        if !conversation.is_participant(user) {
            return Err(domain::DomainError::NotParticipant.into());
        }

        self.typing.set(conversation_id, user, is_typing);
        Ok(())
    }

    /// 用户的会话列表（收件箱），未读计数和对方输入中状态以请求者视角给出。
    pub async fn conversations_for(
        &self,
        user: Uuid,
    ) -> Result<Vec<ConversationDto>, ApplicationError> {
        let user = UserId::from(user);
        let items = self.conversations.list_for_user(user).await?;

        let mut views = Vec::with_capacity(items.len());
        for conversation in &items {
            let peer = conversation.other_participant(user)?;
            let peer_typing = self.typing.is_typing(conversation.id, peer);
            views.push(ConversationDto::for_user(conversation, user, peer, peer_typing));
        }
        Ok(views)
    }
}
