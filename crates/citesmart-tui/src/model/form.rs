/// Focusable widgets on the form screen, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    #[default]
    File,
    Query,
    Submit,
}

impl FormField {
    pub fn next(self) -> Self {
        match self {
            Self::File => Self::Query,
            Self::Query => Self::Submit,
            Self::Submit => Self::File,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::File => Self::Submit,
            Self::Query => Self::File,
            Self::Submit => Self::Query,
        }
    }
}

/// Editing state of the form that the session itself does not track.
#[derive(Debug, Clone, Default)]
pub struct FormInputs {
    pub focus: FormField,
    /// Path as typed; becomes the selection once committed with Enter.
    pub file_input: String,
}

impl FormInputs {
    /// Typed path with a leading `~/` expanded.
    pub fn expanded_path(&self) -> std::path::PathBuf {
        let raw = self.file_input.trim();
        if let Some(rest) = raw.strip_prefix("~/") {
            if let Some(home) = std::env::var_os("HOME") {
                return std::path::PathBuf::from(home).join(rest);
            }
        }
        std::path::PathBuf::from(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_cycles_both_ways() {
        let mut f = FormField::default();
        for _ in 0..3 {
            f = f.next();
        }
        assert_eq!(f, FormField::File);
        assert_eq!(FormField::File.prev(), FormField::Submit);
    }

    #[test]
    fn path_is_trimmed() {
        let inputs = FormInputs {
            file_input: "  /tmp/paper.pdf ".into(),
            ..Default::default()
        };
        assert_eq!(inputs.expanded_path(), std::path::PathBuf::from("/tmp/paper.pdf"));
    }
}
