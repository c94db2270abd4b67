use unicode_segmentation::UnicodeSegmentation;

/// Multi-line edit buffer; the cursor counts graphemes, not bytes.
#[derive(Clone, Debug, Default)]
pub struct InputBuffer {
    pub text: String,
    pub cursor: usize,
}

impl InputBuffer {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn parts(&self) -> Vec<&str> {
        self.text.graphemes(true).collect()
    }

    /// Takes the text out and resets the cursor.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }

    pub fn insert_text(&mut self, s: &str) {
        let parts = self.parts();
        let idx = self.cursor.min(parts.len());
        let mut new_text = parts[..idx].concat();
        new_text.push_str(s);
        new_text.push_str(&parts[idx..].concat());
        self.text = new_text;
        let added = s.graphemes(true).count();
        self.cursor = (idx + added).min(self.text.graphemes(true).count());
    }

    pub fn delete_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let mut parts = self.parts();
        let idx = self.cursor.min(parts.len());
        parts.remove(idx - 1);
        self.text = parts.concat();
        self.cursor = idx - 1;
    }

    pub fn delete_right(&mut self) {
        let mut parts = self.parts();
        let idx = self.cursor.min(parts.len());
        if idx < parts.len() {
            parts.remove(idx);
            self.text = parts.concat();
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        let len = self.text.graphemes(true).count();
        if self.cursor < len {
            self.cursor += 1;
        }
    }

    pub fn move_line_start(&mut self) {
        let parts = self.parts();
        let mut i = self.cursor.min(parts.len());
        while i > 0 && parts[i - 1] != "\n" {
            i -= 1;
        }
        self.cursor = i;
    }

    pub fn move_line_end(&mut self) {
        let parts = self.parts();
        let mut i = self.cursor.min(parts.len());
        while i < parts.len() && parts[i] != "\n" {
            i += 1;
        }
        self.cursor = i;
    }

    fn word_start_before(parts: &[&str], from: usize) -> usize {
        let mut i = from;
        while i > 0 && parts[i - 1].trim().is_empty() {
            i -= 1;
        }
        while i > 0 && !parts[i - 1].trim().is_empty() {
            i -= 1;
        }
        i
    }

    pub fn move_word_left(&mut self) {
        let parts = self.parts();
        self.cursor = Self::word_start_before(&parts, self.cursor.min(parts.len()));
    }

    pub fn move_word_right(&mut self) {
        let parts = self.parts();
        let mut i = self.cursor.min(parts.len());
        while i < parts.len() && parts[i].trim().is_empty() {
            i += 1;
        }
        while i < parts.len() && !parts[i].trim().is_empty() {
            i += 1;
        }
        self.cursor = i;
    }

    pub fn delete_prev_word(&mut self) {
        let mut parts = self.parts();
        let end = self.cursor.min(parts.len());
        let start = Self::word_start_before(&parts, end);
        parts.drain(start..end);
        self.text = parts.concat();
        self.cursor = start;
    }

    pub fn kill_to_line_start(&mut self) {
        let mut parts = self.parts();
        let end = self.cursor.min(parts.len());
        let mut start = end;
        while start > 0 && parts[start - 1] != "\n" {
            start -= 1;
        }
        parts.drain(start..end);
        self.text = parts.concat();
        self.cursor = start;
    }

    pub fn kill_to_line_end(&mut self) {
        let mut parts = self.parts();
        let start = self.cursor.min(parts.len());
        let mut end = start;
        while end < parts.len() && parts[end] != "\n" {
            end += 1;
        }
        parts.drain(start..end);
        self.text = parts.concat();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn buf(text: &str, cursor: usize) -> InputBuffer {
        InputBuffer {
            text: text.to_string(),
            cursor,
        }
    }

    #[test]
    fn insert_and_delete_graphemes() {
        let mut b = InputBuffer::default();
        b.insert_text("héllo 🌸");
        assert_eq!(b.cursor, 7);
        b.delete_left();
        assert_eq!(b.text, "héllo ");
        b.cursor = 0;
        b.delete_right();
        assert_eq!(b.text, "éllo ");
        b.insert_text("h");
        assert_eq!((b.text.as_str(), b.cursor), ("héllo ", 1));
    }

    #[test]
    fn word_motion_and_kill() {
        let mut b = buf("hello big world", 15);
        b.move_word_left();
        assert_eq!(b.cursor, 10);
        b.move_word_left();
        assert_eq!(b.cursor, 6);
        b.move_word_right();
        assert_eq!(b.cursor, 9);
        b.delete_prev_word();
        assert_eq!(b.text, "hello  world");
        assert_eq!(b.cursor, 6);
    }

    #[test]
    fn line_operations_respect_newlines() {
        let mut b = buf("one\ntwo three", 8);
        b.move_line_start();
        assert_eq!(b.cursor, 4);
        b.move_line_end();
        assert_eq!(b.cursor, 13);
        b.cursor = 8;
        b.kill_to_line_end();
        assert_eq!(b.text, "one\ntwo ");
        b.kill_to_line_start();
        assert_eq!(b.text, "one\n");
        assert_eq!(b.cursor, 4);
    }

    #[test]
    fn take_resets() {
        let mut b = buf("send me", 7);
        assert_eq!(b.take(), "send me");
        assert!(b.is_empty());
        assert_eq!(b.cursor, 0);
    }
}
