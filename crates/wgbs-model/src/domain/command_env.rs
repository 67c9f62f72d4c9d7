use crate::KeyValue;

/// Environment overlay applied on top of the inherited environment of a spawned process.
///
/// Stored as an ordered list of key–value pairs; later entries win.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEnv(pub Vec<KeyValue>);

impl CommandEnv {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyValue> {
        self.0.iter()
    }

    pub fn push<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.push(KeyValue::new(key, value));
    }

    /// Effective pairs in first-seen key order, one per key, last value wins.
    pub fn effective(&self) -> Vec<(&str, &str)> {
        let mut out: Vec<(&str, &str)> = Vec::new();
        for kv in &self.0 {
            match out.iter_mut().find(|(k, _)| *k == kv.key()) {
                Some(slot) => slot.1 = kv.value(),
                None => out.push((kv.key(), kv.value())),
            }
        }
        out
    }
}

impl Default for CommandEnv {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::CommandEnv;

    #[test]
    fn env_new_is_empty() {
        let env = CommandEnv::new();
        assert_eq!(env.iter().count(), 0);
        assert!(env.effective().is_empty());
    }

    #[test]
    fn pushes_are_kept_in_order() {
        let mut env = CommandEnv::new();
        env.push("TMPDIR", "/a");
        env.push("TMPDIR", "/b");

        let values: Vec<&str> = env.iter().map(|kv| kv.value()).collect();
        assert_eq!(values, ["/a", "/b"]);
    }

    #[test]
    fn effective_keeps_first_position_and_last_value() {
        let mut env = CommandEnv::new();
        env.push("TMPDIR", "/a");
        env.push("LANG", "C");
        env.push("TMPDIR", "/b");

        assert_eq!(env.effective(), vec![("TMPDIR", "/b"), ("LANG", "C")]);
    }
}
