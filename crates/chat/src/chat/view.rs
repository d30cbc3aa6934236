use std::future::Future;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chatline_api::{
    ApiResult, BoxFuture, ChatBackend, ConversationSummary, HistoryRecord, SearchHit,
    TransportError,
};
use futures::StreamExt;
use futures::stream::FuturesUnordered;

use crate::chat::events::{Completion, CreateIntent, Notice, ShellRequest};
use crate::chat::message::{
    ConversationId, DeliveryTarget, HistoryTarget, Message, RequestSeq, SessionState,
    SessionTransition, TranscriptEpoch,
};
use crate::chat::{ChatSidebar, MessageInput, MessageList, SearchResults};

/// Prefix of generated conversation names; a millisecond timestamp follows.
pub const DEFAULT_CONVERSATION_PREFIX: &str = "New chat";

/// An activation whose history has not arrived yet.
#[derive(Debug, Clone)]
struct PendingActivation {
    target: HistoryTarget,
    previous: SessionState,
    previous_epoch: TranscriptEpoch,
}

/// Session controller: the only owner of the active-conversation pointer and the
/// only writer of the sidebar and transcript projections.
///
/// Every backend call is pushed into `in_flight` as a future resolving to a tagged
/// [`Completion`]. The owner drives them with [`ChatView::next_completion`] and feeds
/// each result back through [`ChatView::apply`], so all mutation happens on one
/// thread, one event at a time.
pub struct ChatView {
    backend: Arc<dyn ChatBackend>,
    sidebar: ChatSidebar,
    message_list: MessageList,
    message_input: MessageInput,
    search_results: SearchResults,
    session: SessionState,
    transcript_epoch: TranscriptEpoch,
    pending_activation: Option<PendingActivation>,
    pending_creation: Option<RequestSeq>,
    applied_list_seq: Option<RequestSeq>,
    latest_search_seq: Option<RequestSeq>,
    next_request_seq: u64,
    in_flight: FuturesUnordered<BoxFuture<'static, Completion>>,
    notices: Vec<Notice>,
    shell_requests: Vec<ShellRequest>,
}

impl ChatView {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            sidebar: ChatSidebar::new(),
            message_list: MessageList::new(),
            message_input: MessageInput::new(),
            search_results: SearchResults::new(),
            session: SessionState::Inactive,
            transcript_epoch: TranscriptEpoch::default(),
            pending_activation: None,
            pending_creation: None,
            applied_list_seq: None,
            latest_search_seq: None,
            next_request_seq: 1,
            in_flight: FuturesUnordered::new(),
            notices: Vec::new(),
            shell_requests: Vec::new(),
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn active_conversation_id(&self) -> Option<&ConversationId> {
        self.session.active_id()
    }

    pub fn sidebar(&self) -> &ChatSidebar {
        &self.sidebar
    }

    pub fn message_list(&self) -> &MessageList {
        &self.message_list
    }

    pub fn message_input(&self) -> &MessageInput {
        &self.message_input
    }

    pub fn search_results(&self) -> &SearchResults {
        &self.search_results
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn take_shell_requests(&mut self) -> Vec<ShellRequest> {
        std::mem::take(&mut self.shell_requests)
    }

    pub fn set_sidebar_filter(&mut self, query: impl Into<String>) {
        self.sidebar.set_filter(query);
    }

    /// True while an activation is waiting for its history.
    pub fn is_switching_conversation(&self) -> bool {
        self.pending_activation.is_some()
    }

    pub fn has_pending_requests(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn pending_request_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Resolves to the next finished request, in network order.
    ///
    /// Returns `None` immediately when nothing is in flight.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.in_flight.next().await
    }

    /// Drives every in-flight request, including follow-ups they trigger, to completion.
    pub async fn settle(&mut self) {
        while let Some(completion) = self.next_completion().await {
            self.apply(completion);
        }
    }

    /// Fetches the full conversation set to replace the sidebar contents.
    pub fn load_conversations(&mut self) {
        let seq = self.alloc_seq();
        let backend = Arc::clone(&self.backend);
        tracing::debug!(seq = seq.0, "loading conversations");

        self.dispatch(async move {
            let result = backend.list_conversations().await;
            Completion::ConversationsLoaded { seq, result }
        });
    }

    /// Replaces the draft with `text` and submits it.
    ///
    /// Blank input is a silent no-op and leaves the existing draft untouched.
    pub fn send_message(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.trim().is_empty() {
            return;
        }

        self.message_input.set_draft(text);
        self.submit();
    }

    /// Submits the current draft.
    ///
    /// With no active conversation one is created first; the message is only
    /// rendered and delivered once the backend has returned the new id. While a
    /// conversation switch is still loading, the draft is kept and nothing is sent.
    pub fn submit(&mut self) {
        let Some(message) = self.message_input.submission() else {
            return;
        };

        if self.pending_activation.is_some() {
            // The transcript on screen still belongs to the previous conversation.
            tracing::debug!("holding submit until the conversation finishes loading");
            return;
        }

        if let Some(conversation_id) = self.session.active_id().cloned() {
            self.message_list.push(Message::user(message.clone()));
            self.message_input.clear();
            self.dispatch_delivery(conversation_id, message);
            return;
        }

        if self.pending_creation.is_some() {
            // The draft stays put; the in-flight creation will carry the first message.
            tracing::debug!("ignoring submit while a conversation is being created");
            return;
        }

        let seq = self.alloc_seq();
        self.pending_creation = Some(seq);
        self.dispatch_create(seq, CreateIntent::FirstMessage(message));
    }

    /// Explicit "new chat": creates an empty conversation and activates it.
    pub fn create_conversation(&mut self) {
        let seq = self.alloc_seq();
        self.dispatch_create(seq, CreateIntent::Blank);
    }

    /// Switches the active conversation and reloads its transcript from history.
    pub fn activate_conversation(&mut self, conversation_id: ConversationId) {
        // A superseded activation never settled, so keep rolling back to what did.
        let (previous, previous_epoch) = match &self.pending_activation {
            Some(pending) => (pending.previous.clone(), pending.previous_epoch),
            None => (self.session.clone(), self.transcript_epoch),
        };

        self.transition(SessionTransition::Activate(conversation_id.clone()));
        self.sidebar.mark_active(Some(conversation_id.clone()));
        self.transcript_epoch = self.alloc_epoch();

        let target = HistoryTarget::new(conversation_id.clone(), self.alloc_seq());
        self.pending_activation = Some(PendingActivation {
            target: target.clone(),
            previous,
            previous_epoch,
        });

        tracing::debug!(
            conversation_id = %conversation_id,
            seq = target.seq.0,
            "activating conversation"
        );

        let backend = Arc::clone(&self.backend);
        self.dispatch(async move {
            let result = backend.chat_history(&target.conversation_id).await;
            Completion::HistoryLoaded { target, result }
        });
    }

    /// Requests deletion; the sidebar is reloaded from the backend on success.
    pub fn delete_conversation(&mut self, conversation_id: ConversationId) {
        let backend = Arc::clone(&self.backend);
        self.dispatch(async move {
            let result = backend.delete_conversation(&conversation_id).await;
            Completion::ConversationDeleted {
                conversation_id,
                result,
            }
        });
    }

    pub fn rename_conversation(
        &mut self,
        conversation_id: ConversationId,
        name: impl Into<String>,
    ) {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return;
        }

        let backend = Arc::clone(&self.backend);
        self.dispatch(async move {
            let result = backend.rename_conversation(&conversation_id, &name).await;
            Completion::ConversationRenamed {
                conversation_id,
                result,
            }
        });
    }

    /// Searches every conversation; only the most recent query is ever shown.
    pub fn search_messages(&mut self, query: impl Into<String>) {
        let query = query.into().trim().to_string();
        if query.is_empty() {
            self.latest_search_seq = None;
            self.search_results.clear();
            return;
        }

        let seq = self.alloc_seq();
        self.latest_search_seq = Some(seq);

        let backend = Arc::clone(&self.backend);
        self.dispatch(async move {
            let result = backend.search_messages(&query).await;
            Completion::SearchCompleted { seq, query, result }
        });
    }

    /// Activates the conversation of the search hit at a 1-based position.
    pub fn open_search_hit(&mut self, position: usize) -> bool {
        let Some(conversation_id) = self
            .search_results
            .hit_at(position)
            .map(|hit| hit.conversation_id.clone())
        else {
            return false;
        };

        self.activate_conversation(conversation_id);
        true
    }

    /// Runs the continuation of one finished request.
    pub fn apply(&mut self, completion: Completion) {
        let operation = completion.operation();

        match completion {
            Completion::ConversationsLoaded { seq, result } => {
                self.finish_load_conversations(operation, seq, result);
            }
            Completion::ConversationCreated {
                seq,
                intent,
                result,
            } => self.finish_create(operation, seq, intent, result),
            Completion::ReplyReceived { target, result } => {
                self.finish_delivery(operation, target, result);
            }
            Completion::HistoryLoaded { target, result } => {
                self.finish_activation(operation, target, result);
            }
            Completion::ConversationDeleted {
                conversation_id,
                result,
            } => self.finish_delete(operation, conversation_id, result),
            Completion::ConversationRenamed {
                conversation_id,
                result,
            } => self.finish_rename(operation, conversation_id, result),
            Completion::SearchCompleted { seq, query, result } => {
                self.finish_search(operation, seq, query, result);
            }
        }
    }

    fn finish_load_conversations(
        &mut self,
        operation: &'static str,
        seq: RequestSeq,
        result: ApiResult<Vec<ConversationSummary>>,
    ) {
        if self.applied_list_seq.is_some_and(|applied| applied > seq) {
            tracing::debug!(seq = seq.0, "discarding conversation list older than the sidebar");
            if let Err(error) = result {
                self.report(operation, &error);
            }
            return;
        }

        match result {
            Ok(conversations) => {
                tracing::debug!(seq = seq.0, count = conversations.len(), "conversations loaded");
                self.applied_list_seq = Some(seq);
                self.sidebar.replace(conversations);
                self.sidebar.mark_active(self.session.active_id().cloned());
            }
            Err(error) => self.report(operation, &error),
        }
    }

    fn finish_create(
        &mut self,
        operation: &'static str,
        seq: RequestSeq,
        intent: CreateIntent,
        result: ApiResult<ConversationSummary>,
    ) {
        if self.pending_creation == Some(seq) {
            self.pending_creation = None;
        }

        let conversation = match result {
            Ok(conversation) => conversation,
            Err(error) => {
                // Nothing was rendered or cleared yet, so the draft is still there to retry.
                self.report(operation, &error);
                return;
            }
        };

        let conversation_id = conversation.id.clone();
        tracing::info!(
            conversation_id = %conversation_id,
            name = %conversation.name,
            "created conversation"
        );

        self.sidebar.prepend(conversation);
        self.mark_sidebar_written();
        self.enter_conversation(conversation_id.clone());

        match intent {
            CreateIntent::FirstMessage(message) => {
                self.message_list.push(Message::user(message.clone()));
                // Text typed while the creation was in flight is not ours to clear.
                if self.message_input.submission().as_deref() == Some(message.as_str()) {
                    self.message_input.clear();
                }
                self.dispatch_delivery(conversation_id, message);
            }
            CreateIntent::Blank => self.shell_requests.push(ShellRequest::HideSidebar),
        }
    }

    fn finish_delivery(
        &mut self,
        operation: &'static str,
        target: DeliveryTarget,
        result: ApiResult<String>,
    ) {
        match result {
            Ok(reply) => {
                if !self.delivery_is_current(&target) {
                    tracing::debug!(
                        conversation_id = %target.conversation_id,
                        "discarding reply for a transcript that is no longer shown"
                    );
                    return;
                }
                self.message_list.push(Message::bot(reply));
            }
            // The optimistic user message stays visible; there is no rollback or retry.
            Err(error) => self.report(operation, &error),
        }
    }

    fn finish_activation(
        &mut self,
        operation: &'static str,
        target: HistoryTarget,
        result: ApiResult<Vec<HistoryRecord>>,
    ) {
        let Some(pending) = self
            .pending_activation
            .take_if(|pending| pending.target == target)
        else {
            tracing::debug!(
                conversation_id = %target.conversation_id,
                seq = target.seq.0,
                "discarding stale chat history"
            );
            return;
        };

        match result {
            Ok(records) => {
                tracing::debug!(
                    conversation_id = %target.conversation_id,
                    count = records.len(),
                    "chat history loaded"
                );
                self.message_list
                    .set_messages(records.into_iter().map(Message::from).collect());
                self.shell_requests.push(ShellRequest::HideSidebar);
            }
            Err(error) => {
                self.report(operation, &error);
                self.restore_session(pending);
            }
        }
    }

    fn finish_delete(
        &mut self,
        operation: &'static str,
        conversation_id: ConversationId,
        result: ApiResult<()>,
    ) {
        if let Err(error) = result {
            self.report(operation, &error);
            return;
        }

        tracing::info!(conversation_id = %conversation_id, "deleted conversation");

        if let Some(pending) = self.pending_activation.as_mut()
            && pending.previous.is_active(&conversation_id)
        {
            pending.previous = SessionState::Inactive;
        }

        if self.session.is_active(&conversation_id) {
            self.transition(SessionTransition::Close(conversation_id));
            self.pending_activation = None;
            self.sidebar.mark_active(None);
            self.message_list.show_placeholder();
            self.transcript_epoch = self.alloc_epoch();
        }

        self.load_conversations();
    }

    fn finish_rename(
        &mut self,
        operation: &'static str,
        conversation_id: ConversationId,
        result: ApiResult<ConversationSummary>,
    ) {
        match result {
            Ok(renamed) => {
                if self.sidebar.rename(&conversation_id, renamed.name) {
                    self.mark_sidebar_written();
                }
            }
            Err(error) => self.report(operation, &error),
        }
    }

    fn finish_search(
        &mut self,
        operation: &'static str,
        seq: RequestSeq,
        query: String,
        result: ApiResult<Vec<SearchHit>>,
    ) {
        if self.latest_search_seq != Some(seq) {
            tracing::debug!(seq = seq.0, %query, "discarding superseded search");
            return;
        }

        match result {
            Ok(hits) => self.search_results.set_results(query, hits),
            Err(error) => self.report(operation, &error),
        }
    }

    /// Points the session at a conversation whose transcript is known to be empty.
    fn enter_conversation(&mut self, conversation_id: ConversationId) {
        self.transition(SessionTransition::Activate(conversation_id.clone()));
        self.pending_activation = None;
        self.sidebar.mark_active(Some(conversation_id));
        self.message_list.clear();
        self.transcript_epoch = self.alloc_epoch();
    }

    fn restore_session(&mut self, pending: PendingActivation) {
        let previous = pending.previous;
        self.sidebar.mark_active(previous.active_id().cloned());
        if matches!(previous, SessionState::Inactive) {
            self.message_list.show_placeholder();
        }
        self.transition(SessionTransition::Restore(previous));
        self.transcript_epoch = pending.previous_epoch;
    }

    fn transition(&mut self, transition: SessionTransition) {
        match self.session.apply(transition) {
            Ok(next) => self.session = next,
            Err(rejection) => {
                tracing::warn!(?rejection, "rejected session transition");
            }
        }
    }

    fn delivery_is_current(&self, target: &DeliveryTarget) -> bool {
        target.epoch == self.transcript_epoch && self.session.is_active(&target.conversation_id)
    }

    fn dispatch_create(&mut self, seq: RequestSeq, intent: CreateIntent) {
        let name = default_conversation_name();
        tracing::debug!(seq = seq.0, %name, "creating conversation");

        let backend = Arc::clone(&self.backend);
        self.dispatch(async move {
            let result = backend.create_conversation(&name).await;
            Completion::ConversationCreated {
                seq,
                intent,
                result,
            }
        });
    }

    fn dispatch_delivery(&mut self, conversation_id: ConversationId, message: String) {
        let target = DeliveryTarget::new(conversation_id, self.transcript_epoch);
        let backend = Arc::clone(&self.backend);

        self.dispatch(async move {
            let result = backend
                .send_message(&target.conversation_id, &message)
                .await;
            Completion::ReplyReceived { target, result }
        });
    }

    fn dispatch<F>(&mut self, request: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        self.in_flight.push(Box::pin(request));
    }

    /// Local sidebar writes count as the newest list state, so list responses
    /// issued before them can no longer roll the sidebar back.
    fn mark_sidebar_written(&mut self) {
        self.applied_list_seq = Some(self.alloc_seq());
    }

    fn report(&mut self, operation: &'static str, error: &TransportError) {
        tracing::error!(operation, %error, "request failed");
        self.notices.push(Notice {
            operation,
            message: error.to_string(),
        });
    }

    fn alloc_seq(&mut self) -> RequestSeq {
        let seq = RequestSeq::new(self.next_request_seq);
        self.next_request_seq = self.next_request_seq.saturating_add(1);
        seq
    }

    fn alloc_epoch(&mut self) -> TranscriptEpoch {
        TranscriptEpoch::new(self.alloc_seq().0)
    }
}

/// Timestamp-derived name for conversations the user did not name.
pub fn default_conversation_name() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis());
    format!("{DEFAULT_CONVERSATION_PREFIX} {millis}")
}
