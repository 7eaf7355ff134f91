//! Editable forms shown in a modal over the current page.
//!
//! A form is a flat list of labelled fields. Text fields take typed input;
//! select fields cycle through a fixed list of choices. Values are always the
//! raw text a draft expects, so a select stores the chosen option's value.

use ncc_core::ValidationError;

// ─── Fields ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
  pub value: String,
  pub label: String,
}

impl Choice {
  pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
    Self {
      value: value.into(),
      label: label.into(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
  Text,
  /// Rendered masked.
  Secret,
  /// The first choice is usually a blank "none selected" entry.
  Select(Vec<Choice>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
  /// Wire name of the value, matched against [`ValidationError::field`].
  pub key:   &'static str,
  pub label: &'static str,
  pub value: String,
  pub kind:  FieldKind,
}

impl Field {
  pub fn text(key: &'static str, label: &'static str, value: impl Into<String>) -> Self {
    Self {
      key,
      label,
      value: value.into(),
      kind: FieldKind::Text,
    }
  }

  pub fn secret(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      value: String::new(),
      kind: FieldKind::Secret,
    }
  }

  pub fn select(
    key: &'static str,
    label: &'static str,
    value: impl Into<String>,
    choices: Vec<Choice>,
  ) -> Self {
    Self {
      key,
      label,
      value: value.into(),
      kind: FieldKind::Select(choices),
    }
  }

  /// What the form shows for this field.
  pub fn display(&self) -> String {
    match &self.kind {
      FieldKind::Text => self.value.clone(),
      FieldKind::Secret => "•".repeat(self.value.chars().count()),
      FieldKind::Select(choices) => choices
        .iter()
        .find(|c| c.value == self.value)
        .map(|c| c.label.clone())
        .unwrap_or_else(|| self.value.clone()),
    }
  }
}

// ─── Form ─────────────────────────────────────────────────────────────────────

/// Which record a form edits, and whether it creates or updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormKind {
  Negotiation { editing: Option<String> },
  Company { editing: Option<i64> },
  Mining { editing: Option<i64> },
  Union { editing: Option<i64> },
  User { editing: Option<i64> },
  Monitoring { editing: Option<i64> },
  ReportFilter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Form {
  pub kind:   FormKind,
  pub title:  String,
  pub fields: Vec<Field>,
  pub focus:  usize,
  /// The last rejection, shown under the offending field.
  pub error:  Option<ValidationError>,
}

impl Form {
  pub fn new(kind: FormKind, title: impl Into<String>, fields: Vec<Field>) -> Self {
    Self {
      kind,
      title: title.into(),
      fields,
      focus: 0,
      error: None,
    }
  }

  /// Current value of `key`, `""` when the form has no such field.
  pub fn value(&self, key: &str) -> &str {
    self
      .fields
      .iter()
      .find(|f| f.key == key)
      .map(|f| f.value.as_str())
      .unwrap_or_default()
  }

  pub fn set(&mut self, key: &str, value: impl Into<String>) {
    if let Some(field) = self.fields.iter_mut().find(|f| f.key == key) {
      field.value = value.into();
    }
  }

  pub fn focused(&self) -> Option<&Field> { self.fields.get(self.focus) }

  pub fn next(&mut self) {
    if !self.fields.is_empty() {
      self.focus = (self.focus + 1) % self.fields.len();
    }
  }

  pub fn prev(&mut self) {
    if !self.fields.is_empty() {
      self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
    }
  }

  /// Type `c` into the focused text field. Selects ignore typing.
  pub fn input(&mut self, c: char) {
    if let Some(field) = self.fields.get_mut(self.focus)
      && !matches!(field.kind, FieldKind::Select(_))
    {
      field.value.push(c);
    }
  }

  pub fn backspace(&mut self) {
    if let Some(field) = self.fields.get_mut(self.focus)
      && !matches!(field.kind, FieldKind::Select(_))
    {
      field.value.pop();
    }
  }

  /// Move the focused select to the next (`forward`) or previous choice.
  pub fn cycle(&mut self, forward: bool) {
    let Some(field) = self.fields.get_mut(self.focus) else {
      return;
    };
    let FieldKind::Select(choices) = &field.kind else {
      return;
    };
    if choices.is_empty() {
      return;
    }
    let len = choices.len();
    let current = choices.iter().position(|c| c.value == field.value);
    let next = match (current, forward) {
      (None, true) => 0,
      (None, false) => len - 1,
      (Some(i), true) => (i + 1) % len,
      (Some(i), false) => (i + len - 1) % len,
    };
    field.value = choices[next].value.clone();
  }

  /// Record a rejection and move focus to the field it names.
  pub fn reject(&mut self, error: ValidationError) {
    if let Some(i) = self.fields.iter().position(|f| f.key == error.field) {
      self.focus = i;
    }
    self.error = Some(error);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn form() -> Form {
    Form::new(
      FormKind::Mining { editing: None },
      "Test",
      vec![
        Field::text("nombre", "Name", ""),
        Field::select(
          "estado",
          "Status",
          "a",
          vec![Choice::new("a", "Alpha"), Choice::new("b", "Beta")],
        ),
        Field::secret("contrasena", "Password"),
      ],
    )
  }

  #[test]
  fn typing_goes_to_text_fields_only() {
    let mut form = form();
    form.input('x');
    form.input('y');
    form.backspace();
    assert_eq!(form.value("nombre"), "x");

    form.next();
    form.input('z');
    assert_eq!(form.value("estado"), "a");
  }

  #[test]
  fn select_cycles_both_ways() {
    let mut form = form();
    form.next();
    form.cycle(true);
    assert_eq!(form.value("estado"), "b");
    assert_eq!(form.focused().unwrap().display(), "Beta");
    form.cycle(true);
    assert_eq!(form.value("estado"), "a");
    form.cycle(false);
    assert_eq!(form.value("estado"), "b");
  }

  #[test]
  fn focus_wraps() {
    let mut form = form();
    form.prev();
    assert_eq!(form.focus, 2);
    form.next();
    assert_eq!(form.focus, 0);
  }

  #[test]
  fn secret_is_masked() {
    let mut form = form();
    form.focus = 2;
    form.input('p');
    form.input('w');
    assert_eq!(form.focused().unwrap().display(), "••");
    assert_eq!(form.value("contrasena"), "pw");
  }

  #[test]
  fn reject_focuses_named_field() {
    let mut form = form();
    form.focus = 2;
    form.reject(ValidationError::new("nombre", "Required."));
    assert_eq!(form.focus, 0);
    assert_eq!(form.error.as_ref().unwrap().message, "Required.");
  }
}
