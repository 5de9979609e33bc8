//! Per-user navigation and chat state

use crate::assistant::{Answerer, analyze_table};
use crate::storage::{Outcome, Storage};
use crate::table::Record;
use crate::upload::UploadOutcome;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    #[default]
    Upload,
    Browse,
    FileDetail,
    Chat,
}

/// Where a table conversation was started from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatOrigin {
    Upload,
    Browse,
}

/// Identifies one table conversation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ChatKey {
    pub origin: ChatOrigin,
    pub file: Option<i64>,
    pub sheet: String,
    pub table: String,
}

impl ChatKey {
    /// A conversation about a freshly uploaded table
    pub fn upload(sheet: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            origin: ChatOrigin::Upload,
            file: None,
            sheet: sheet.into(),
            table: table.into(),
        }
    }

    /// A conversation about a stored file's table
    pub fn browse(file_id: i64, sheet: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            origin: ChatOrigin::Browse,
            file: Some(file_id),
            sheet: sheet.into(),
            table: table.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Session {
    page: Page,
    selected_file_id: Option<i64>,
    viewing_file_id: Option<i64>,
    selected_sheet: Option<String>,
    pending_delete: Option<i64>,
    upload_result: Option<UploadOutcome>,
    chats: HashMap<ChatKey, Vec<ChatMessage>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn selected_file_id(&self) -> Option<i64> {
        self.selected_file_id
    }

    pub fn viewing_file_id(&self) -> Option<i64> {
        self.viewing_file_id
    }

    pub fn selected_sheet(&self) -> Option<&str> {
        self.selected_sheet.as_deref()
    }

    pub fn pending_delete(&self) -> Option<i64> {
        self.pending_delete
    }

    pub fn upload_result(&self) -> Option<&UploadOutcome> {
        self.upload_result.as_ref()
    }

    pub fn navigate(&mut self, page: Page) {
        self.page = page;
    }

    /// Keep a successful upload on screen; failures leave no result behind
    pub fn record_upload(&mut self, outcome: UploadOutcome) {
        self.upload_result = outcome.success.then_some(outcome);
    }

    /// Leave the upload result for the file listing
    pub fn browse_uploaded(&mut self) {
        self.upload_result = None;
        self.page = Page::Browse;
    }

    /// Leave the upload result for the chat page on the uploaded file
    pub fn chat_about_upload(&mut self) {
        if let Some(outcome) = self.upload_result.take() {
            self.selected_file_id = outcome.file_id;
        }
        self.page = Page::Chat;
    }

    pub fn select_file(&mut self, file_id: i64) {
        self.selected_file_id = Some(file_id);
    }

    pub fn select_sheet(&mut self, sheet: impl Into<String>) {
        self.selected_sheet = Some(sheet.into());
    }

    pub fn view_file(&mut self, file_id: i64) {
        self.viewing_file_id = Some(file_id);
        self.selected_sheet = None;
        self.page = Page::FileDetail;
    }

    pub fn close_file(&mut self) {
        self.viewing_file_id = None;
        self.selected_sheet = None;
        self.page = Page::Browse;
    }

    pub fn request_delete(&mut self, file_id: i64) {
        self.pending_delete = Some(file_id);
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Delete the pending file. A successful delete clears any selection of it.
    pub fn confirm_delete(&mut self, storage: &Storage) -> Option<Outcome> {
        let file_id = self.pending_delete.take()?;
        let outcome = storage.delete_excel_file(file_id);
        if outcome.success {
            if self.selected_file_id == Some(file_id) {
                self.selected_file_id = None;
            }
            if self.viewing_file_id == Some(file_id) {
                self.close_file();
            }
        }
        Some(outcome)
    }

    /// The conversation for a table, opened with a greeting on first access
    pub fn transcript(&mut self, key: &ChatKey) -> &[ChatMessage] {
        self.chats
            .entry(key.clone())
            .or_insert_with(|| {
                vec![ChatMessage::new(
                    Role::Assistant,
                    format!("Ask me anything about this table: {}", key.table),
                )]
            })
            .as_slice()
    }

    /// Add a user turn, answer it against `records` and return the reply
    pub fn ask(
        &mut self,
        key: &ChatKey,
        question: &str,
        answerer: &dyn Answerer,
        records: &[Record],
        preview_rows: usize,
    ) -> String {
        self.transcript(key);
        let scoped = format!(
            "{} - Answer based on this table: {} in sheet: {}",
            question, key.table, key.sheet
        );
        let reply = analyze_table(answerer, records, &scoped, preview_rows);

        if let Some(messages) = self.chats.get_mut(key) {
            messages.push(ChatMessage::new(Role::User, question));
            messages.push(ChatMessage::new(Role::Assistant, reply.clone()));
        }
        reply
    }
}
