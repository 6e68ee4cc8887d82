/// Single-line text field used by the login form, the search box and the
/// record forms. The cursor counts characters, not bytes.
#[derive(Default, Clone, Debug)]
pub struct LineEdit {
    pub value: String,
    pub cursor: usize,
    pub password: bool,
}

impl LineEdit {
    pub fn masked() -> Self {
        Self { password: true, ..Self::default() }
    }

    pub fn with(s: impl Into<String>) -> Self {
        let mut edit = Self::default();
        edit.set(s);
        edit
    }

    pub fn set(&mut self, s: impl Into<String>) {
        self.value = s.into();
        self.cursor = self.value.chars().count();
    }

    fn byte_index(&self, char_pos: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    pub fn push(&mut self, ch: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn left(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    pub fn right(&mut self) {
        if self.cursor < self.value.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    pub fn trimmed(&self) -> &str {
        self.value.trim()
    }

    pub fn rendered(&self) -> String {
        if self.password {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editing_in_the_middle() {
        let mut e = LineEdit::with("Gs");
        e.left();
        e.push('a');
        assert_eq!(e.value, "Gas");
        e.right();
        e.backspace();
        assert_eq!(e.value, "Ga");
    }

    #[test]
    fn multibyte_characters() {
        let mut e = LineEdit::with("café");
        e.backspace();
        assert_eq!(e.value, "caf");
        e.push('é');
        e.left();
        e.delete();
        assert_eq!(e.value, "caf");
    }

    #[test]
    fn password_is_masked() {
        let mut e = LineEdit::masked();
        e.set("hunter2");
        assert_eq!(e.rendered(), "*******");
    }
}
