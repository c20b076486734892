use crossterm::event::{Event, KeyEvent};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;
use uuid::Uuid;

use crate::contact::Contact;

/// Single-line inline editor for the sort-key override.
#[derive(Default)]
pub struct InlineEditor {
    pub active: bool,
    target: Option<Uuid>,
    input: Input,
}

impl InlineEditor {
    pub fn start(&mut self, current: &str, target: Uuid) {
        self.active = true;
        self.target = Some(target);
        self.input = Input::new(current.to_string());
    }

    pub fn cancel(&mut self) {
        self.active = false;
        self.target = None;
        self.input.reset();
    }

    pub fn target(&self) -> Option<Uuid> {
        self.target
    }

    pub fn value(&self) -> &str {
        self.input.value()
    }

    pub fn visual_cursor(&self) -> usize {
        self.input.visual_cursor()
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        self.input.handle_event(&Event::Key(key)).is_some()
    }
}

/// Which form field currently has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormFocus {
    Name,
    Address(usize),
    SortKey,
}

/// Add/edit contact form: a name line, a growable set of address lines,
/// and an optional sort-key override. When the override is left blank the
/// key is re-derived from the name on save.
pub struct ContactForm {
    /// Contact being edited, `None` when adding.
    pub target: Option<Uuid>,
    pub name: Input,
    pub address: Vec<Input>,
    pub key_override: Input,
    pub focus: FormFocus,
}

impl ContactForm {
    pub fn add() -> Self {
        Self {
            target: None,
            name: Input::default(),
            address: vec![Input::default(), Input::default()],
            key_override: Input::default(),
            focus: FormFocus::Name,
        }
    }

    pub fn edit(contact: &Contact) -> Self {
        let address = if contact.address_lines.is_empty() {
            vec![Input::default()]
        } else {
            contact
                .address_lines
                .iter()
                .map(|l| Input::new(l.clone()))
                .collect()
        };
        Self {
            target: Some(contact.id),
            name: Input::new(contact.name.clone()),
            address,
            key_override: Input::new(contact.sort_key.clone()),
            focus: FormFocus::Name,
        }
    }

    pub fn title(&self) -> &'static str {
        if self.target.is_some() {
            "EDIT CONTACT"
        } else {
            "ADD CONTACT"
        }
    }

    pub fn focus_next(&mut self) {
        self.focus = match self.focus {
            FormFocus::Name if self.address.is_empty() => FormFocus::SortKey,
            FormFocus::Name => FormFocus::Address(0),
            FormFocus::Address(i) if i + 1 < self.address.len() => FormFocus::Address(i + 1),
            FormFocus::Address(_) => FormFocus::SortKey,
            FormFocus::SortKey => FormFocus::Name,
        };
    }

    pub fn focus_prev(&mut self) {
        self.focus = match self.focus {
            FormFocus::Name if self.address.is_empty() => FormFocus::SortKey,
            FormFocus::Name => FormFocus::SortKey,
            FormFocus::Address(0) => FormFocus::Name,
            FormFocus::Address(i) => FormFocus::Address(i - 1),
            FormFocus::SortKey if self.address.is_empty() => FormFocus::Name,
            FormFocus::SortKey => FormFocus::Address(self.address.len() - 1),
        };
    }

    /// Insert a fresh address line after the focused one and focus it.
    pub fn add_line(&mut self) {
        let at = match self.focus {
            FormFocus::Address(i) => i + 1,
            _ => self.address.len(),
        };
        self.address.insert(at, Input::default());
        self.focus = FormFocus::Address(at);
    }

    /// Remove the focused address line; the last line is cleared instead of
    /// removed so the form always has one.
    pub fn remove_line(&mut self) {
        let FormFocus::Address(i) = self.focus else {
            return;
        };
        if self.address.len() > 1 {
            self.address.remove(i);
            self.focus = FormFocus::Address(i.min(self.address.len() - 1));
        } else {
            self.address[0] = Input::default();
        }
    }

    pub fn focused_input_mut(&mut self) -> &mut Input {
        match self.focus {
            FormFocus::Name => &mut self.name,
            FormFocus::Address(i) => &mut self.address[i],
            FormFocus::SortKey => &mut self.key_override,
        }
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        self.focused_input_mut()
            .handle_event(&Event::Key(key))
            .is_some()
    }

    /// Non-blank address lines in form order.
    pub fn address_lines(&self) -> Vec<String> {
        self.address
            .iter()
            .map(|input| input.value().trim().to_string())
            .filter(|l| !l.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::parse_contact;

    #[test]
    fn focus_cycles_through_all_fields() {
        let mut form = ContactForm::add();
        assert_eq!(form.focus, FormFocus::Name);
        form.focus_next();
        assert_eq!(form.focus, FormFocus::Address(0));
        form.focus_next();
        assert_eq!(form.focus, FormFocus::Address(1));
        form.focus_next();
        assert_eq!(form.focus, FormFocus::SortKey);
        form.focus_next();
        assert_eq!(form.focus, FormFocus::Name);
        form.focus_prev();
        assert_eq!(form.focus, FormFocus::SortKey);
    }

    #[test]
    fn edit_form_prefills_fields() {
        let c = parse_contact("Jane Doe\n1 Elm St\nAda OH").unwrap();
        let form = ContactForm::edit(&c);
        assert_eq!(form.name.value(), "Jane Doe");
        assert_eq!(form.address.len(), 2);
        assert_eq!(form.address[1].value(), "Ada OH");
        assert_eq!(form.key_override.value(), "DOE");
        assert_eq!(form.target, Some(c.id));
    }

    #[test]
    fn add_and_remove_lines() {
        let mut form = ContactForm::add();
        form.focus = FormFocus::Address(0);
        form.add_line();
        assert_eq!(form.address.len(), 3);
        assert_eq!(form.focus, FormFocus::Address(1));
        form.remove_line();
        form.remove_line();
        assert_eq!(form.address.len(), 1);
        // The last line is cleared, never removed.
        form.remove_line();
        assert_eq!(form.address.len(), 1);
    }

    #[test]
    fn blank_address_lines_are_dropped() {
        let mut form = ContactForm::add();
        form.address[0] = Input::new("1 Elm St".to_string());
        assert_eq!(form.address_lines(), vec!["1 Elm St"]);
    }
}
