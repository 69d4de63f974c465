pub const DEFAULT_HISTORY_SIZE: usize = 1000;

/// In-memory command history, oldest entry first.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<String>,
    max_len: usize,
}

impl Default for History {
    fn default() -> Self {
        History::new(DEFAULT_HISTORY_SIZE)
    }
}

impl History {
    pub fn new(max_len: usize) -> Self {
        let mut history = History { entries: Vec::new(), max_len: DEFAULT_HISTORY_SIZE };
        history.set_max_len(max_len);
        history
    }

    // Add a command to history
    pub fn push(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        if self.entries.last().is_some_and(|last| last == trimmed) {
            return;
        }
        self.entries.push(trimmed.to_string());
        self.evict();
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Zero restores the default capacity.
    pub fn set_max_len(&mut self, max_len: usize) {
        self.max_len = if max_len == 0 { DEFAULT_HISTORY_SIZE } else { max_len };
        self.evict();
    }

    // Remove oldest entries if exceeding the limit
    fn evict(&mut self) {
        if self.entries.len() > self.max_len {
            let excess = self.entries.len() - self.max_len;
            self.entries.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_trims_and_skips_empty() {
        let mut h = History::default();
        h.push("  ls -l  ");
        h.push("   ");
        h.push("");
        assert_eq!(h.entries(), &["ls -l".to_string()]);
    }

    #[test]
    fn test_push_skips_consecutive_duplicate() {
        let mut h = History::default();
        h.push("ls");
        h.push("ls ");
        h.push("pwd");
        h.push("ls");
        assert_eq!(h.entries(), &["ls", "pwd", "ls"]);
    }

    #[test]
    fn test_evicts_oldest() {
        let mut h = History::new(2);
        for line in ["a", "b", "c"] {
            h.push(line);
        }
        assert_eq!(h.entries(), &["b", "c"]);
    }

    #[test]
    fn test_set_max_len_trims_and_zero_restores_default() {
        let mut h = History::new(10);
        for i in 0..5 {
            h.push(&format!("cmd {}", i));
        }
        h.set_max_len(3);
        assert_eq!(h.entries(), &["cmd 2", "cmd 3", "cmd 4"]);
        h.set_max_len(0);
        assert_eq!(h.max_len(), DEFAULT_HISTORY_SIZE);
        assert_eq!(h.len(), 3);
        h.clear();
        assert!(h.is_empty());
    }
}
