//! Conversation memory.

use std::collections::VecDeque;

use tertulia_model::ModelMessage;

/// A bounded window over the messages of one conversation.
///
/// The window holds at most `capacity` messages, the pinned system message
/// included. Appending past the capacity evicts the oldest non-system
/// messages first. The system message is never evicted, only replaced.
///
/// An assistant message that requested tool calls is evicted together with
/// the tool results that follow it, so the window never starts in the
/// middle of a tool round.
#[derive(Clone, Debug)]
pub struct Conversation {
    capacity: usize,
    system: Option<ModelMessage>,
    items: VecDeque<ModelMessage>,
}

impl Conversation {
    /// Creates an empty conversation holding at most `capacity` messages.
    ///
    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            system: None,
            items: VecDeque::new(),
        }
    }

    /// Returns the maximum number of retained messages.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of retained messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len() + usize::from(self.system.is_some())
    }

    /// Returns `true` if no message is retained.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the pinned system message, if any.
    #[inline]
    pub fn system(&self) -> Option<&ModelMessage> {
        self.system.as_ref()
    }

    /// Appends a message, evicting old ones if the window is full.
    pub fn append(&mut self, msg: ModelMessage) {
        if let ModelMessage::System(_) = msg {
            if self.system.as_ref() != Some(&msg) {
                self.system = Some(msg);
                self.evict();
            }
            return;
        }
        if let ModelMessage::Tool(result) = &msg {
            if !self.has_tool_call(&result.id) {
                debug!("dropped a tool result whose call was evicted: {}", result.id);
                return;
            }
        }
        self.items.push_back(msg);
        self.evict();
    }

    /// Returns the retained messages, the system message first.
    pub fn messages(&self) -> Vec<ModelMessage> {
        self.system
            .iter()
            .chain(self.items.iter())
            .cloned()
            .collect()
    }

    /// Removes every message except the pinned system message.
    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
    }

    fn has_tool_call(&self, id: &str) -> bool {
        self.items.iter().any(|msg| match msg {
            ModelMessage::Assistant(assistant) => {
                assistant.tool_calls.iter().any(|call| call.id == id)
            }
            _ => false,
        })
    }

    fn evict(&mut self) {
        while self.len() > self.capacity {
            let Some(evicted) = self.items.pop_front() else {
                break;
            };
            trace!("evicted a message: {evicted:?}");
            if evicted.has_tool_calls() {
                while let Some(ModelMessage::Tool(_)) = self.items.front() {
                    self.items.pop_front();
                }
            }
        }
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::with_capacity(20)
    }
}
