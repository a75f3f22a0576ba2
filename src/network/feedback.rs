// ============================================
// Feedback - Сообщения оператору
// ============================================

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Error,
}

/// Всё, что ядро может сказать оператору
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    CannotPerformAction,
    CannotCopy,
    CannotPaste,
    InvalidTemplateName(String),
    UnknownTemplate(String),
    /// Ошибка хранилища шаблонов
    StorageFailure(String),
    /// Ошибка одного под-куба заливки
    FillError(String),
    FilledVolume(u64),
    CopySucceeded(String),
    PasteSucceeded(String),
    AreaPrepared(String),
    PermissionDenied,
    /// Строка отчёта линейки
    Measurement(String),
}

impl Notice {
    pub fn severity(&self) -> Severity {
        match self {
            Notice::CannotPerformAction
            | Notice::CannotCopy
            | Notice::CannotPaste
            | Notice::InvalidTemplateName(_)
            | Notice::UnknownTemplate(_)
            | Notice::StorageFailure(_)
            | Notice::FillError(_)
            | Notice::PermissionDenied => Severity::Error,
            Notice::FilledVolume(_)
            | Notice::CopySucceeded(_)
            | Notice::PasteSucceeded(_)
            | Notice::AreaPrepared(_)
            | Notice::Measurement(_) => Severity::Info,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::CannotPerformAction => f.write_str("Cannot perform action"),
            Notice::CannotCopy => f.write_str("Cannot copy: no template name given"),
            Notice::CannotPaste => f.write_str("Cannot paste: no template name given"),
            Notice::InvalidTemplateName(name) => write!(f, "Invalid template name '{}'", name),
            Notice::UnknownTemplate(name) => write!(f, "Unknown template '{}'", name),
            Notice::StorageFailure(reason) => write!(f, "Template storage failed: {}", reason),
            Notice::FillError(error) => f.write_str(error),
            Notice::FilledVolume(count) => write!(f, "Filled {} blocks", count),
            Notice::CopySucceeded(name) => write!(f, "Saved template '{}'", name),
            Notice::PasteSucceeded(name) => write!(f, "Placed template '{}'", name),
            Notice::AreaPrepared(name) => write!(f, "Prepared area for template '{}'", name),
            Notice::PermissionDenied => f.write_str("You do not have permission to edit"),
            Notice::Measurement(line) => f.write_str(line),
        }
    }
}

/// Канал обратной связи
pub trait Feedback {
    fn notify(&mut self, notice: Notice);
}

impl Feedback for Vec<Notice> {
    fn notify(&mut self, notice: Notice) {
        self.push(notice);
    }
}
