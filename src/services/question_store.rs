use crate::models::question::{QuestionRecord, QuestionType};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub type SessionId = String;

/// Index-addressed question collections, one per session. Unknown sessions
/// behave as empty collections.
pub trait QuestionStore: Send + Sync {
    fn get_all(&self, session: &str) -> Vec<QuestionRecord>;
    /// Replaces the session's questions wholesale.
    fn set_all(&self, session: &str, questions: Vec<QuestionRecord>);
    /// Appends and returns the new index.
    fn add(&self, session: &str, question: QuestionRecord) -> usize;
    fn update(&self, session: &str, index: usize, question: QuestionRecord) -> bool;
    fn delete(&self, session: &str, index: usize) -> bool;
    fn get(&self, session: &str, index: usize) -> Option<QuestionRecord>;
    /// Case-insensitive substring match over question and answer text.
    fn search(&self, session: &str, keyword: &str) -> Vec<QuestionRecord>;
    fn filter_by_type(&self, session: &str, question_type: QuestionType) -> Vec<QuestionRecord>;
    fn clear(&self, session: &str);
    fn count(&self, session: &str) -> usize;
    fn sessions(&self) -> Vec<SessionId>;
}

#[derive(Debug, Default)]
pub struct InMemoryQuestionStore {
    inner: RwLock<HashMap<SessionId, Vec<QuestionRecord>>>,
}

impl InMemoryQuestionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<SessionId, Vec<QuestionRecord>>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SessionId, Vec<QuestionRecord>>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl QuestionStore for InMemoryQuestionStore {
    fn get_all(&self, session: &str) -> Vec<QuestionRecord> {
        self.read().get(session).cloned().unwrap_or_default()
    }

    fn set_all(&self, session: &str, questions: Vec<QuestionRecord>) {
        tracing::debug!(session, count = questions.len(), "replacing session questions");
        self.write().insert(session.to_string(), questions);
    }

    fn add(&self, session: &str, question: QuestionRecord) -> usize {
        let mut map = self.write();
        let list = map.entry(session.to_string()).or_default();
        list.push(question);
        list.len() - 1
    }

    fn update(&self, session: &str, index: usize, question: QuestionRecord) -> bool {
        match self.write().get_mut(session).and_then(|list| list.get_mut(index)) {
            Some(slot) => {
                *slot = question;
                true
            }
            None => false,
        }
    }

    fn delete(&self, session: &str, index: usize) -> bool {
        match self.write().get_mut(session) {
            Some(list) if index < list.len() => {
                list.remove(index);
                true
            }
            _ => false,
        }
    }

    fn get(&self, session: &str, index: usize) -> Option<QuestionRecord> {
        self.read().get(session).and_then(|list| list.get(index)).cloned()
    }

    fn search(&self, session: &str, keyword: &str) -> Vec<QuestionRecord> {
        let needle = keyword.to_lowercase();
        self.read()
            .get(session)
            .map(|list| {
                list.iter()
                    .filter(|q| {
                        q.question.to_lowercase().contains(&needle)
                            || q.answer.to_lowercase().contains(&needle)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn filter_by_type(&self, session: &str, question_type: QuestionType) -> Vec<QuestionRecord> {
        self.read()
            .get(session)
            .map(|list| {
                list.iter()
                    .filter(|q| q.question_type == question_type)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn clear(&self, session: &str) {
        self.write().remove(session);
    }

    fn count(&self, session: &str) -> usize {
        self.read().get(session).map_or(0, Vec::len)
    }

    fn sessions(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}
