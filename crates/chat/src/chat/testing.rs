//! Scripted in-memory backend for controller tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chatline_api::{
    ApiResult, BoxFuture, ChatBackend, ConversationId, ConversationSummary, HistoryRecord,
    SearchHit, TransportError,
};
use futures::FutureExt;
use tokio::sync::oneshot;

use crate::chat::events::Completion;
use crate::chat::view::ChatView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    List,
    Create,
    Send,
    History,
    Delete,
    Rename,
    Search,
}

/// One request as the backend saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    List,
    Create {
        name: String,
    },
    Send {
        conversation_id: ConversationId,
        message: String,
    },
    History(ConversationId),
    Delete(ConversationId),
    Rename {
        conversation_id: ConversationId,
        name: String,
    },
    Search(String),
}

struct Hold {
    op: Op,
    conversation_id: Option<ConversationId>,
    gate: oneshot::Receiver<()>,
}

#[derive(Default)]
struct ScriptState {
    conversations: Vec<ConversationSummary>,
    histories: HashMap<ConversationId, Vec<HistoryRecord>>,
    reply: Option<String>,
    failing: HashSet<Op>,
    holds: Vec<Hold>,
    calls: Vec<Call>,
    next_id: u64,
}

/// Answers from in-memory state computed when the request is issued.
///
/// A held request keeps its answer until the matching sender fires (or is
/// dropped), which lets tests complete requests out of order.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    state: Mutex<ScriptState>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_conversations(self, conversations: Vec<ConversationSummary>) -> Self {
        self.state.lock().unwrap().conversations = conversations;
        self
    }

    pub(crate) fn with_history(self, conversation_id: &str, records: &[(&str, &str)]) -> Self {
        let records = records
            .iter()
            .map(|(sender, message)| HistoryRecord::new(*sender, *message))
            .collect();
        self.state
            .lock()
            .unwrap()
            .histories
            .insert(ConversationId::text(conversation_id), records);
        self
    }

    /// Replies with fixed text instead of echoing the message.
    pub(crate) fn reply_with(self, reply: &str) -> Self {
        self.state.lock().unwrap().reply = Some(reply.to_string());
        self
    }

    pub(crate) fn fail(&self, op: Op) {
        self.state.lock().unwrap().failing.insert(op);
    }

    pub(crate) fn recover(&self, op: Op) {
        self.state.lock().unwrap().failing.remove(&op);
    }

    /// Holds the next request of `op` (optionally only for one conversation).
    pub(crate) fn hold(&self, op: Op, conversation_id: Option<&str>) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.state.lock().unwrap().holds.push(Hold {
            op,
            conversation_id: conversation_id.map(ConversationId::text),
            gate,
        });
        release
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn conversation_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .conversations
            .iter()
            .map(|conversation| conversation.id.to_string())
            .collect()
    }

    fn respond<'a, T, F>(
        &'a self,
        call: Call,
        op: Op,
        conversation_id: Option<ConversationId>,
        answer: F,
    ) -> BoxFuture<'a, ApiResult<T>>
    where
        T: Send + 'a,
        F: FnOnce(&mut ScriptState) -> T + Send + 'a,
    {
        Box::pin(async move {
            let (result, gate) = {
                let mut state = self.state.lock().unwrap();
                state.calls.push(call);

                let gate = state
                    .holds
                    .iter()
                    .position(|hold| {
                        hold.op == op
                            && (hold.conversation_id.is_none()
                                || hold.conversation_id == conversation_id)
                    })
                    .map(|index| state.holds.remove(index).gate);

                let result = if state.failing.contains(&op) {
                    Err(scripted_failure(op))
                } else {
                    Ok(answer(&mut state))
                };
                (result, gate)
            };

            if let Some(gate) = gate {
                let _ = gate.await;
            }
            result
        })
    }
}

fn scripted_failure(op: Op) -> TransportError {
    TransportError::Status {
        stage: "scripted",
        endpoint: format!("{op:?}"),
        status: 500,
        message: "scripted failure".to_string(),
    }
}

impl ChatBackend for ScriptedBackend {
    fn list_conversations<'a>(&'a self) -> BoxFuture<'a, ApiResult<Vec<ConversationSummary>>> {
        self.respond(Call::List, Op::List, None, |state| state.conversations.clone())
    }

    fn create_conversation<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, ApiResult<ConversationSummary>> {
        let call = Call::Create {
            name: name.to_string(),
        };
        self.respond(call, Op::Create, None, move |state| {
            state.next_id += 1;
            let conversation = ConversationSummary::new(format!("c{}", state.next_id), name);
            state.conversations.insert(0, conversation.clone());
            conversation
        })
    }

    fn send_message<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        message: &'a str,
    ) -> BoxFuture<'a, ApiResult<String>> {
        let call = Call::Send {
            conversation_id: conversation_id.clone(),
            message: message.to_string(),
        };
        self.respond(call, Op::Send, Some(conversation_id.clone()), move |state| {
            let reply = state
                .reply
                .clone()
                .unwrap_or_else(|| format!("echo: {message}"));
            let history = state.histories.entry(conversation_id.clone()).or_default();
            history.push(HistoryRecord::new("user", message));
            history.push(HistoryRecord::new("ai", reply.clone()));
            reply
        })
    }

    fn chat_history<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, ApiResult<Vec<HistoryRecord>>> {
        let call = Call::History(conversation_id.clone());
        self.respond(call, Op::History, Some(conversation_id.clone()), move |state| {
            state
                .histories
                .get(conversation_id)
                .cloned()
                .unwrap_or_default()
        })
    }

    fn delete_conversation<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, ApiResult<()>> {
        let call = Call::Delete(conversation_id.clone());
        self.respond(call, Op::Delete, Some(conversation_id.clone()), move |state| {
            state
                .conversations
                .retain(|conversation| conversation.id != *conversation_id);
            state.histories.remove(conversation_id);
        })
    }

    fn rename_conversation<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        name: &'a str,
    ) -> BoxFuture<'a, ApiResult<ConversationSummary>> {
        let call = Call::Rename {
            conversation_id: conversation_id.clone(),
            name: name.to_string(),
        };
        self.respond(call, Op::Rename, Some(conversation_id.clone()), move |state| {
            if let Some(conversation) = state
                .conversations
                .iter_mut()
                .find(|conversation| conversation.id == *conversation_id)
            {
                conversation.name = name.to_string();
            }
            ConversationSummary::new(conversation_id.clone(), name)
        })
    }

    fn search_messages<'a>(&'a self, query: &'a str) -> BoxFuture<'a, ApiResult<Vec<SearchHit>>> {
        let call = Call::Search(query.to_string());
        self.respond(call, Op::Search, None, move |state| {
            let needle = query.to_lowercase();
            let mut hits = Vec::new();
            for conversation in &state.conversations {
                let Some(records) = state.histories.get(&conversation.id) else {
                    continue;
                };
                hits.extend(
                    records
                        .iter()
                        .filter(|record| record.message.to_lowercase().contains(&needle))
                        .map(|record| SearchHit {
                            message: record.message.clone(),
                            sender: record.sender.clone(),
                            conversation_id: conversation.id.clone(),
                            conversation_name: conversation.name.clone(),
                            timestamp: None,
                        }),
                );
            }
            hits
        })
    }
}

/// Applies every completion that is ready right now without waiting on held ones.
pub(crate) fn drain_ready(view: &mut ChatView) -> usize {
    let mut applied = 0;
    while let Some(Some(completion)) = view.next_completion().now_or_never() {
        view.apply(completion);
        applied += 1;
    }
    applied
}

/// Takes exactly the next ready completion without applying it.
pub(crate) fn next_ready(view: &mut ChatView) -> Option<Completion> {
    view.next_completion().now_or_never().flatten()
}
