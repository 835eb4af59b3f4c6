use std::collections::HashSet;
use std::sync::Mutex;

/// The set of LINE users who have ever messaged the bot.
///
/// Lives only for the process lifetime; the nightly sweep iterates a
/// snapshot while webhook handlers keep adding to the live set. There
/// is no removal path.
#[derive(Default)]
pub struct UserRegistry {
    users: Mutex<HashSet<String>>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a user. Returns true the first time an id is seen.
    pub fn add(&self, user_id: &str) -> bool {
        let mut users = self.users.lock().expect("registry lock poisoned");
        users.insert(user_id.to_string())
    }

    /// Point-in-time copy, safe to iterate without holding the lock.
    pub fn snapshot(&self) -> Vec<String> {
        let users = self.users.lock().expect("registry lock poisoned");
        users.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.users.lock().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
