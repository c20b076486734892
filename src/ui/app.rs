use std::collections::HashSet;
use std::io::stdout;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;
use tui_widgets::popup::PopupState;
use uuid::Uuid;

use crate::config::{Config, UiColors};
use crate::contact::{parse_blocks, sort_contacts, Contact};
use crate::docx_io;
use crate::search;
use crate::store;

use super::draw;
use super::edit::{ContactForm, InlineEditor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneFocus {
    Filter,
    List,
}

#[derive(Debug, Clone)]
pub struct ConfirmModal {
    pub title: String,
    pub message: String,
    pub action: ConfirmAction,
}

/// Action to perform when the confirm modal is accepted.
#[derive(Debug, Clone)]
pub enum ConfirmAction {
    /// Delete the listed contacts
    DeleteContacts(Vec<Uuid>),
    /// Quit with unsaved changes
    Quit,
}

/// What the path-input modal is collecting a path for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathAction {
    Open,
    SaveAs,
}

pub struct PathModal {
    pub action: PathAction,
    pub input: Input,
}

impl PathModal {
    pub fn title(&self) -> &'static str {
        match self.action {
            PathAction::Open => "OPEN FILE",
            PathAction::SaveAs => "SAVE AS",
        }
    }
}

/// Help modal state with scroll support.
#[derive(Debug, Clone)]
pub struct HelpModal {
    pub scroll: usize,
    pub total_lines: usize,
    pub viewport_height: usize,
}

impl HelpModal {
    pub fn new(total_lines: usize) -> Self {
        Self {
            scroll: 0,
            total_lines,
            viewport_height: 10, // Updated during render
        }
    }

    pub fn scroll_down(&mut self, lines: usize) {
        let max_scroll = self.total_lines.saturating_sub(self.viewport_height);
        self.scroll = (self.scroll + lines).min(max_scroll);
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
    }
}

pub struct App<'a> {
    config: &'a Config,
    pub contacts: Vec<Contact>,
    store_path: PathBuf,
    /// Marked contacts by id; survives reorders and edits in place.
    pub marked: HashSet<Uuid>,
    /// Selection index into the filtered view.
    pub selected: usize,
    pub filter_input: Input,
    pub focused_pane: PaneFocus,
    /// Document backing the list, set by open and save-as.
    pub file_path: Option<PathBuf>,
    pub dirty: bool,
    pub status: Option<String>,
    pub editor: InlineEditor,
    pub form: Option<ContactForm>,
    pub confirm_modal: Option<ConfirmModal>,
    pub path_modal: Option<PathModal>,
    pub help_modal: Option<HelpModal>,
    pub modal_popup: PopupState,
    /// Viewport rows of the list, set during render for paging.
    pub list_height: usize,
}

impl<'a> App<'a> {
    pub fn new(config: &'a Config, store_path: PathBuf, open: Option<PathBuf>) -> Result<Self> {
        let mut app = Self {
            config,
            contacts: Vec::new(),
            store_path,
            marked: HashSet::new(),
            selected: 0,
            filter_input: Input::default(),
            focused_pane: PaneFocus::Filter,
            file_path: None,
            dirty: false,
            status: None,
            editor: InlineEditor::default(),
            form: None,
            confirm_modal: None,
            path_modal: None,
            help_modal: None,
            modal_popup: PopupState::default(),
            list_height: 10,
        };

        match open {
            Some(path) => app.load_file(path),
            None => app.load_store(),
        }
        Ok(app)
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop<B>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B: ratatui::backend::Backend,
    {
        loop {
            draw::render(terminal, self)?;

            if event::poll(Duration::from_millis(250))? {
                match event::read()? {
                    Event::Key(key) => {
                        if self.handle_key(key)? {
                            break;
                        }
                    }
                    Event::Resize(_, _) => {}
                    _ => {}
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // View helpers
    // =========================================================================

    /// Indices into `contacts` that match the current filter, in list order.
    pub fn filtered_indices(&self) -> Vec<usize> {
        match search::normalize_query(self.filter_input.value()) {
            None => (0..self.contacts.len()).collect(),
            Some(query) => self
                .contacts
                .iter()
                .enumerate()
                .filter(|(_, c)| search::matches(c, &query))
                .map(|(i, _)| i)
                .collect(),
        }
    }

    pub fn current_contact(&self) -> Option<&Contact> {
        let visible = self.filtered_indices();
        visible
            .get(self.selected.min(visible.len().saturating_sub(1)))
            .map(|&i| &self.contacts[i])
    }

    fn current_contact_id(&self) -> Option<Uuid> {
        self.current_contact().map(|c| c.id)
    }

    fn clamp_selection(&mut self) {
        let visible = self.filtered_indices().len();
        if visible == 0 {
            self.selected = 0;
        } else if self.selected >= visible {
            self.selected = visible - 1;
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let visible = self.filtered_indices().len();
        if visible == 0 {
            return;
        }
        let max = visible as isize - 1;
        self.selected = (self.selected as isize + delta).clamp(0, max) as usize;
    }

    /// Keep the selection on the given record after a re-sort or reload.
    fn select_id(&mut self, id: Uuid) {
        if let Some(pos) = self
            .filtered_indices()
            .iter()
            .position(|&i| self.contacts[i].id == id)
        {
            self.selected = pos;
        } else {
            self.clamp_selection();
        }
    }

    fn set_status<S: Into<String>>(&mut self, message: S) {
        self.status = Some(message.into());
    }

    pub fn ui_colors(&self) -> &UiColors {
        &self.config.ui
    }

    // =========================================================================
    // Data operations
    // =========================================================================

    fn load_store(&mut self) {
        match store::load(&self.store_path) {
            Ok(Some(mut contacts)) => {
                sort_contacts(&mut contacts);
                let count = contacts.len();
                self.contacts = contacts;
                self.set_status(format!("Loaded {count} contact(s) from the default store"));
            }
            Ok(None) => {
                self.set_status("No contacts loaded. Open an address file to get started.");
            }
            Err(err) => {
                eprintln!("warning: {err:#}");
                self.set_status("Could not read the default store; starting empty");
            }
        }
    }

    fn load_file(&mut self, path: PathBuf) {
        match docx_io::read_blocks(&path) {
            Ok(blocks) => {
                let mut contacts = parse_blocks(&blocks);
                sort_contacts(&mut contacts);
                let count = contacts.len();
                self.contacts = contacts;
                self.marked.clear();
                self.selected = 0;
                self.dirty = false;
                self.set_status(format!("Loaded {count} contact(s) from {}", path.display()));
                self.file_path = Some(path);
            }
            Err(err) => self.set_status(format!("Error reading file: {err}")),
        }
    }

    fn save_to(&mut self, path: PathBuf) {
        sort_contacts(&mut self.contacts);
        if let Err(err) = docx_io::write_label_file(&path, &self.contacts) {
            self.set_status(format!("Error saving file: {err}"));
            return;
        }
        if let Err(err) = store::save(&self.store_path, &self.contacts) {
            eprintln!("warning: {err:#}");
        }
        self.dirty = false;
        self.set_status(format!("Saved {}", path.display()));
        self.file_path = Some(path);
    }

    fn apply_form(&mut self) {
        let Some(form) = self.form.take() else {
            return;
        };

        let name = form.name.value().trim().to_string();
        if name.is_empty() {
            self.set_status("Name must not be empty");
            self.form = Some(form);
            return;
        }

        let focus_id = match form.target {
            Some(id) => {
                let Some(contact) = self.contacts.iter_mut().find(|c| c.id == id) else {
                    self.set_status("Contact no longer exists");
                    return;
                };
                contact.name = name;
                contact.address_lines = form.address_lines();
                contact.rederive(form.key_override.value());
                self.set_status("Contact updated");
                id
            }
            None => {
                let mut contact = Contact {
                    id: Uuid::new_v4(),
                    name,
                    address_lines: form.address_lines(),
                    full_address: String::new(),
                    sort_key: String::new(),
                };
                contact.rederive(form.key_override.value());
                let id = contact.id;
                self.contacts.push(contact);
                self.set_status("Contact added");
                id
            }
        };

        sort_contacts(&mut self.contacts);
        self.dirty = true;
        self.select_id(focus_id);
    }

    fn apply_sort_key_edit(&mut self) {
        let Some(id) = self.editor.target() else {
            self.editor.cancel();
            return;
        };
        let value = self.editor.value().trim().to_string();
        self.editor.cancel();

        let Some(contact) = self.contacts.iter_mut().find(|c| c.id == id) else {
            return;
        };
        // A cleared field re-derives the key from the name.
        contact.rederive(&value);
        let new_key = contact.sort_key.clone();
        sort_contacts(&mut self.contacts);
        self.dirty = true;
        self.select_id(id);
        self.set_status(format!("Sorts as {new_key}"));
    }

    fn delete_contacts(&mut self, ids: &[Uuid]) {
        let before = self.contacts.len();
        self.contacts.retain(|c| !ids.contains(&c.id));
        for id in ids {
            self.marked.remove(id);
        }
        let removed = before - self.contacts.len();
        if removed > 0 {
            self.dirty = true;
        }
        self.clamp_selection();
        self.set_status(format!("Deleted {removed} contact(s)"));
    }

    /// Marked contacts if any, otherwise the current one.
    fn deletion_targets(&self) -> Vec<Uuid> {
        if self.marked.is_empty() {
            self.current_contact_id().into_iter().collect()
        } else {
            self.marked.iter().copied().collect()
        }
    }

    // =========================================================================
    // Key handling
    // =========================================================================

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        // Ctrl+C always quits (hardcoded for safety)
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return Ok(true);
        }

        if self.help_modal.is_some() {
            self.handle_help_modal_key(key);
            return Ok(false);
        }

        if self.editor.active {
            self.handle_editor_key(key);
            return Ok(false);
        }

        if self.confirm_modal.is_some() {
            return self.handle_confirm_modal_key(key);
        }

        if self.form.is_some() {
            self.handle_form_key(key);
            return Ok(false);
        }

        if self.path_modal.is_some() {
            self.handle_path_modal_key(key);
            return Ok(false);
        }

        if self.focused_pane == PaneFocus::Filter && self.handle_filter_key(key)? {
            return Ok(false);
        }

        self.handle_list_key(key)
    }

    fn handle_help_modal_key(&mut self, key: KeyEvent) {
        let modal_keys = &self.config.keys.modal;
        if self.key_matches_any(&key, &modal_keys.cancel)
            || self.key_matches_any(&key, &self.config.keys.global.quit)
        {
            self.help_modal = None;
            return;
        }
        if let Some(help) = &mut self.help_modal {
            match key.code {
                KeyCode::Down | KeyCode::Char('j') => help.scroll_down(1),
                KeyCode::Up | KeyCode::Char('k') => help.scroll_up(1),
                KeyCode::PageDown => help.scroll_down(10),
                KeyCode::PageUp => help.scroll_up(10),
                _ => {}
            }
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let editor_keys = &self.config.keys.editor;
        if self.key_matches_any(&key, &editor_keys.cancel) {
            self.editor.cancel();
            self.set_status("Edit cancelled");
            return;
        }
        if self.key_matches_any(&key, &editor_keys.confirm) {
            self.apply_sort_key_edit();
            return;
        }
        self.editor.handle_key_event(key);
    }

    fn handle_confirm_modal_key(&mut self, key: KeyEvent) -> Result<bool> {
        let modal_keys = &self.config.keys.modal;
        if self.key_matches_any(&key, &modal_keys.cancel)
            || matches!(key.code, KeyCode::Char('n') | KeyCode::Char('N'))
        {
            self.confirm_modal = None;
            return Ok(false);
        }
        let confirmed = self.key_matches_any(&key, &modal_keys.confirm)
            || matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y'));
        if !confirmed {
            return Ok(false);
        }

        let Some(modal) = self.confirm_modal.take() else {
            return Ok(false);
        };
        match modal.action {
            ConfirmAction::DeleteContacts(ids) => {
                self.delete_contacts(&ids);
                Ok(false)
            }
            ConfirmAction::Quit => Ok(true),
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let modal_keys = &self.config.keys.modal;
        if self.key_matches_any(&key, &modal_keys.cancel) {
            self.form = None;
            self.set_status("Cancelled");
            return;
        }
        if self.key_matches_any(&key, &modal_keys.confirm) {
            self.apply_form();
            return;
        }
        let next = self.key_matches_any(&key, &modal_keys.next);
        let prev = self.key_matches_any(&key, &modal_keys.prev);
        let add_line = self.key_matches_any(&key, &modal_keys.add_line);
        let remove_line = self.key_matches_any(&key, &modal_keys.remove_line);
        let Some(form) = &mut self.form else {
            return;
        };
        if next {
            form.focus_next();
        } else if prev {
            form.focus_prev();
        } else if add_line {
            form.add_line();
        } else if remove_line {
            form.remove_line();
        } else {
            form.handle_key_event(key);
        }
    }

    fn handle_path_modal_key(&mut self, key: KeyEvent) {
        let modal_keys = &self.config.keys.modal;
        if self.key_matches_any(&key, &modal_keys.cancel) {
            self.path_modal = None;
            self.set_status("Cancelled");
            return;
        }
        if self.key_matches_any(&key, &modal_keys.confirm) {
            let Some(modal) = self.path_modal.take() else {
                return;
            };
            let raw = modal.input.value().trim().to_string();
            if raw.is_empty() {
                self.set_status("Cancelled");
                return;
            }
            let path = crate::config::expand_tilde(raw.as_ref());
            match modal.action {
                PathAction::Open => self.load_file(path),
                PathAction::SaveAs => self.save_to(path),
            }
            return;
        }
        if let Some(modal) = &mut self.path_modal {
            modal.input.handle_event(&Event::Key(key));
        }
    }

    /// Keys handled while the filter box has focus. Returns true when the
    /// event was consumed.
    fn handle_filter_key(&mut self, key: KeyEvent) -> Result<bool> {
        let list_keys = &self.config.keys.list;

        // Esc moves focus to the list without clearing the filter.
        if matches!(key.code, KeyCode::Esc) {
            self.focused_pane = PaneFocus::List;
            return Ok(true);
        }
        if matches!(key.code, KeyCode::Enter) {
            self.focused_pane = PaneFocus::List;
            return Ok(true);
        }

        // Navigate results while typing.
        if self.key_matches_any(&key, &list_keys.next) && matches!(key.code, KeyCode::Down) {
            self.move_selection(1);
            return Ok(true);
        }
        if self.key_matches_any(&key, &list_keys.prev) && matches!(key.code, KeyCode::Up) {
            self.move_selection(-1);
            return Ok(true);
        }

        if self
            .filter_input
            .handle_event(&Event::Key(key))
            .is_some()
        {
            self.clamp_selection();
            return Ok(true);
        }
        Ok(false)
    }

    fn handle_list_key(&mut self, key: KeyEvent) -> Result<bool> {
        let list_keys = &self.config.keys.list;
        let global = &self.config.keys.global;

        if self.key_matches_any(&key, &global.quit) {
            if self.dirty {
                self.modal_popup = PopupState::default();
                self.confirm_modal = Some(ConfirmModal {
                    title: "QUIT".to_string(),
                    message: "Unsaved changes will be lost. Quit anyway?".to_string(),
                    action: ConfirmAction::Quit,
                });
                return Ok(false);
            }
            return Ok(true);
        }

        if self.key_matches_any(&key, &global.search) {
            self.focused_pane = PaneFocus::Filter;
            return Ok(false);
        }

        if self.key_matches_any(&key, &global.help) {
            self.help_modal = Some(HelpModal::new(draw::help_lines().len()));
            return Ok(false);
        }

        if self.key_matches_any(&key, &list_keys.next) {
            self.move_selection(1);
            return Ok(false);
        }
        if self.key_matches_any(&key, &list_keys.prev) {
            self.move_selection(-1);
            return Ok(false);
        }
        if self.key_matches_any(&key, &list_keys.page_down) {
            self.move_selection(self.list_height as isize);
            return Ok(false);
        }
        if self.key_matches_any(&key, &list_keys.page_up) {
            self.move_selection(-(self.list_height as isize));
            return Ok(false);
        }

        if self.key_matches_any(&key, &list_keys.mark) {
            if let Some(id) = self.current_contact_id() {
                if !self.marked.insert(id) {
                    self.marked.remove(&id);
                }
                self.move_selection(1);
            }
            return Ok(false);
        }

        if self.key_matches_any(&key, &list_keys.add) {
            self.form = Some(ContactForm::add());
            self.set_status("Add contact");
            return Ok(false);
        }

        if self.key_matches_any(&key, &list_keys.edit) {
            match self.current_contact() {
                Some(contact) => {
                    self.form = Some(ContactForm::edit(contact));
                    self.set_status("Edit contact");
                }
                None => self.set_status("No contact selected"),
            }
            return Ok(false);
        }

        if self.key_matches_any(&key, &list_keys.edit_key) {
            match self.current_contact() {
                Some(contact) => {
                    let (key_value, id) = (contact.sort_key.clone(), contact.id);
                    self.editor.start(&key_value, id);
                    self.set_status("Editing sort key (blank re-derives from the name)");
                }
                None => self.set_status("No contact selected"),
            }
            return Ok(false);
        }

        if self.key_matches_any(&key, &list_keys.delete) {
            let ids = self.deletion_targets();
            if ids.is_empty() {
                self.set_status("No contact selected");
                return Ok(false);
            }
            let message = if ids.len() == 1 {
                "Are you sure you want to delete this contact?".to_string()
            } else {
                format!("Are you sure you want to delete {} contacts?", ids.len())
            };
            self.modal_popup = PopupState::default();
            self.confirm_modal = Some(ConfirmModal {
                title: "DELETE".to_string(),
                message,
                action: ConfirmAction::DeleteContacts(ids),
            });
            return Ok(false);
        }

        if self.key_matches_any(&key, &list_keys.open) {
            self.modal_popup = PopupState::default();
            self.path_modal = Some(PathModal {
                action: PathAction::Open,
                input: Input::default(),
            });
            return Ok(false);
        }

        if self.key_matches_any(&key, &list_keys.save) {
            if self.contacts.is_empty() {
                self.set_status("Nothing to save");
                return Ok(false);
            }
            match self.file_path.clone() {
                Some(path) => self.save_to(path),
                None => self.open_save_as_modal(),
            }
            return Ok(false);
        }

        if self.key_matches_any(&key, &list_keys.save_as) {
            if self.contacts.is_empty() {
                self.set_status("Nothing to save");
                return Ok(false);
            }
            self.open_save_as_modal();
            return Ok(false);
        }

        Ok(false)
    }

    fn open_save_as_modal(&mut self) {
        let suggestion = self
            .file_path
            .clone()
            .unwrap_or_else(|| self.config.export.default_output.clone());
        self.modal_popup = PopupState::default();
        self.path_modal = Some(PathModal {
            action: PathAction::SaveAs,
            input: Input::new(suggestion.to_string_lossy().into_owned()),
        });
    }

    // =========================================================================
    // Key binding matching
    // =========================================================================

    fn key_matches_any(&self, event: &KeyEvent, bindings: &[String]) -> bool {
        bindings.iter().any(|b| key_matches_single(event, b))
    }
}

/// Check if a key event matches a single binding string.
fn key_matches_single(event: &KeyEvent, binding: &str) -> bool {
    let trimmed = binding.trim();
    if trimmed.is_empty() {
        return false;
    }

    // "Ctrl+x" bindings; anything else must come without Ctrl/Alt/Super.
    if let Some(rest) = trimmed
        .to_ascii_lowercase()
        .strip_prefix("ctrl+")
        .map(str::to_string)
    {
        return event.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(event.code, KeyCode::Char(c) if rest == c.to_lowercase().to_string());
    }
    let disallowed = KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER;
    if event.modifiers.intersects(disallowed) {
        return false;
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "enter" => matches!(event.code, KeyCode::Enter),
        "tab" => matches!(event.code, KeyCode::Tab),
        "backtab" | "shift+tab" => matches!(event.code, KeyCode::BackTab),
        "backspace" => matches!(event.code, KeyCode::Backspace),
        "esc" | "escape" => matches!(event.code, KeyCode::Esc),
        "space" => matches!(event.code, KeyCode::Char(' ')),
        "up" => matches!(event.code, KeyCode::Up),
        "down" => matches!(event.code, KeyCode::Down),
        "left" => matches!(event.code, KeyCode::Left),
        "right" => matches!(event.code, KeyCode::Right),
        "pageup" | "page_up" => matches!(event.code, KeyCode::PageUp),
        "pagedown" | "page_down" => matches!(event.code, KeyCode::PageDown),
        "home" => matches!(event.code, KeyCode::Home),
        "end" => matches!(event.code, KeyCode::End),
        lower if lower.starts_with('f') && lower.len() > 1 => match lower[1..].parse::<u8>() {
            Ok(n) => matches!(event.code, KeyCode::F(k) if k == n),
            Err(_) => false,
        },
        _ => {
            // Single character, case-sensitive ('W' means Shift+w).
            let mut chars = trimmed.chars();
            match (chars.next(), chars.next()) {
                (Some(expected), None) => matches!(event.code, KeyCode::Char(c) if c == expected),
                _ => false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn named_keys_match_case_insensitively() {
        assert!(key_matches_single(&key(KeyCode::Enter), "ENTER"));
        assert!(key_matches_single(&key(KeyCode::PageDown), "pagedown"));
        assert!(key_matches_single(&key(KeyCode::F(5)), "F5"));
    }

    #[test]
    fn single_chars_match_case_sensitively() {
        assert!(key_matches_single(&key(KeyCode::Char('w')), "w"));
        assert!(!key_matches_single(&key(KeyCode::Char('w')), "W"));
        assert!(key_matches_single(&key(KeyCode::Char('W')), "W"));
    }

    #[test]
    fn ctrl_bindings_require_the_modifier() {
        let plain = key(KeyCode::Char('n'));
        let ctrl = KeyEvent::new(KeyCode::Char('n'), KeyModifiers::CONTROL);
        assert!(!key_matches_single(&plain, "Ctrl+n"));
        assert!(key_matches_single(&ctrl, "Ctrl+n"));
        // Ctrl is otherwise disallowed.
        assert!(!key_matches_single(&ctrl, "n"));
    }
}
