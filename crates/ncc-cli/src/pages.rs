//! Console pages: what each one lists, and the forms that edit its records.

use std::str::FromStr;

use ncc_core::{
  ValidationError,
  date::{format_display_date, parse_strict_date},
  filter::filter_rows,
  normalize::{MonitoringRow, NegotiationRow},
  record::{Company, MiningOperator, NegotiationStatus, Role, Union, UnionKind, User, role_name},
  report::{ReportFilter, paginate},
  validate::{
    CompanyDraft, MiningDraft, MonitoringDraft, NegotiationDraft, UnionDraft, UserDraft,
    suggest_term_date,
  },
};
use strum::{EnumIter, IntoEnumIterator};

use crate::{
  client::Resource,
  form::{Choice, Field, Form, FormKind},
};

/// Rows per report page.
pub const REPORT_PAGE_SIZE: usize = 10;

// ─── Pages ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum Page {
  Negotiations,
  Listing,
  Reports,
  Monitoring,
  Companies,
  MiningOperators,
  Unions,
  Users,
}

impl Page {
  pub fn title(self) -> &'static str {
    match self {
      Self::Negotiations => "Negotiations",
      Self::Listing => "Listing",
      Self::Reports => "Reports",
      Self::Monitoring => "Monitoring",
      Self::Companies => "Companies",
      Self::MiningOperators => "Mining operators",
      Self::Unions => "Unions",
      Self::Users => "Users",
    }
  }

  /// Everyone may read the listing and the reports; the rest is for
  /// administrators.
  pub fn admin_only(self) -> bool { !matches!(self, Self::Listing | Self::Reports) }

  /// Whether records on this page can be created, edited and deleted.
  pub fn editable(self) -> bool { !matches!(self, Self::Listing | Self::Reports) }

  /// The collection rows on this page are written to.
  pub fn resource(self) -> Resource {
    match self {
      Self::Negotiations | Self::Listing | Self::Reports => Resource::Negotiations,
      Self::Monitoring => Resource::Monitoring,
      Self::Companies => Resource::Companies,
      Self::MiningOperators => Resource::MiningOperators,
      Self::Unions => Resource::Unions,
      Self::Users => Resource::Users,
    }
  }

  /// Pages shown to a user with the given role.
  pub fn visible(admin: bool) -> Vec<Page> {
    Page::iter().filter(|p| admin || !p.admin_only()).collect()
  }
}

// ─── Loaded data ──────────────────────────────────────────────────────────────

/// The last fetched collection for every page.
#[derive(Debug, Clone, Default)]
pub struct Data {
  pub companies:    Vec<Company>,
  pub mining:       Vec<MiningOperator>,
  pub unions:       Vec<Union>,
  pub negotiations: Vec<NegotiationRow>,
  pub monitoring:   Vec<MonitoringRow>,
  pub users:        Vec<User>,
  pub roles:        Vec<Role>,
}

// ─── Tables ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
  /// Server id, `None` for rows that cannot be written back.
  pub id:    Option<String>,
  /// Short description used in confirmations.
  pub label: String,
  pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
  pub headers: Vec<&'static str>,
  pub rows:    Vec<TableRow>,
  /// Collection size before filtering.
  pub total:   usize,
  /// `(page, pages)` for paginated tables.
  pub paging:  Option<(usize, usize)>,
}

fn dash(s: &str) -> String {
  if s.is_empty() { "-".into() } else { s.to_owned() }
}

fn listing_cells(row: &NegotiationRow) -> Vec<String> {
  vec![
    dash(&row.mining),
    dash(&row.company),
    dash(&row.union),
    dash(&row.contract),
    dash(&row.status),
    NegotiationRow::headcount_display(row.total_headcount),
    NegotiationRow::headcount_display(row.unionized_headcount),
    row.unionized_pct_display(),
  ]
}

fn negotiation_row(row: &NegotiationRow, cells: Vec<String>) -> TableRow {
  TableRow {
    id: row.id.server().map(str::to_owned),
    label: row.option_label(),
    cells,
  }
}

/// Build the table for `page` from `data`, narrowed by the free-text
/// `query`. Reports are narrowed by `report` instead and paginated.
pub fn table(
  page: Page,
  data: &Data,
  query: &str,
  report: &ReportFilter,
  report_page: usize,
) -> Table {
  match page {
    Page::Negotiations => Table {
      headers: vec![
        "Company", "Tax id", "Mining", "Union", "Contract", "Status", "Start", "Term", "Expiry",
      ],
      rows:    filter_rows(&data.negotiations, query)
        .into_iter()
        .map(|r| {
          negotiation_row(r, vec![
            dash(&r.company),
            dash(&r.company_tax_id),
            dash(&r.mining),
            dash(&r.union),
            dash(&r.contract),
            dash(&r.status),
            format_display_date(&r.start_date),
            format_display_date(&r.term_date),
            format_display_date(&r.expiry_date),
          ])
        })
        .collect(),
      total:   data.negotiations.len(),
      paging:  None,
    },

    Page::Listing => Table {
      headers: vec![
        "Mining", "Company", "Union", "Contract", "Status", "Headcount", "Unionized", "%",
      ],
      rows:    filter_rows(&data.negotiations, query)
        .into_iter()
        .map(|r| negotiation_row(r, listing_cells(r)))
        .collect(),
      total:   data.negotiations.len(),
      paging:  None,
    },

    Page::Reports => {
      let page = paginate(report.apply(&data.negotiations), report_page, REPORT_PAGE_SIZE);
      Table {
        headers: vec![
          "Mining", "Company", "Union", "Contract", "Status", "Headcount", "Unionized", "%",
          "Start",
        ],
        rows:    page
          .rows
          .iter()
          .map(|r| {
            let mut cells = listing_cells(r);
            cells.push(format_display_date(&r.start_date));
            negotiation_row(r, cells)
          })
          .collect(),
        total:   data.negotiations.len(),
        paging:  Some((page.page, page.pages)),
      }
    }

    Page::Monitoring => Table {
      headers: vec!["ID", "Negotiation", "Start", "Comments"],
      rows:    filter_rows(&data.monitoring, query)
        .into_iter()
        .map(|m| {
          let id = m.entry.id.map(|id| id.to_string());
          TableRow {
            label: format!("monitoring #{}", id.as_deref().unwrap_or("-")),
            cells: vec![
              dash(id.as_deref().unwrap_or_default()),
              dash(&m.negotiation),
              format_display_date(m.entry.start_date.as_deref().unwrap_or_default()),
              dash(m.entry.comments.as_deref().unwrap_or_default()),
            ],
            id,
          }
        })
        .collect(),
      total:   data.monitoring.len(),
      paging:  None,
    },

    Page::Companies => Table {
      headers: vec!["Name", "Tax id", "Mining"],
      rows:    filter_rows(&data.companies, query)
        .into_iter()
        .map(|c| TableRow {
          id:    c.id.map(|id| id.to_string()),
          label: c.name.clone(),
          cells: vec![dash(&c.name), dash(&c.tax_id), dash(c.mining_name())],
        })
        .collect(),
      total:   data.companies.len(),
      paging:  None,
    },

    Page::MiningOperators => Table {
      headers: vec!["Name"],
      rows:    filter_rows(&data.mining, query)
        .into_iter()
        .map(|m| TableRow {
          id:    m.id.map(|id| id.to_string()),
          label: m.name.clone(),
          cells: vec![dash(&m.name)],
        })
        .collect(),
      total:   data.mining.len(),
      paging:  None,
    },

    Page::Unions => Table {
      headers: vec!["Name", "Federation", "Type"],
      rows:    filter_rows(&data.unions, query)
        .into_iter()
        .map(|u| TableRow {
          id:    u.id.map(|id| id.to_string()),
          label: u.name.clone(),
          cells: vec![
            dash(&u.name),
            dash(u.federation.as_deref().unwrap_or_default()),
            dash(u.kind.as_deref().unwrap_or_default()),
          ],
        })
        .collect(),
      total:   data.unions.len(),
      paging:  None,
    },

    Page::Users => Table {
      headers: vec!["Name", "Surname", "Email", "Handle", "Role"],
      rows:    filter_rows(&data.users, query)
        .into_iter()
        .map(|u| TableRow {
          id:    u.id.map(|id| id.to_string()),
          label: u.handle.clone(),
          cells: vec![
            dash(&u.name),
            dash(&u.surname),
            dash(&u.email),
            dash(&u.handle),
            role_name(&data.roles, u.role_id).to_owned(),
          ],
        })
        .collect(),
      total:   data.users.len(),
      paging:  None,
    },
  }
}

// ─── Choices ──────────────────────────────────────────────────────────────────

fn none_choice() -> Choice { Choice::new("", "—") }

fn with_none(choices: impl IntoIterator<Item = Choice>) -> Vec<Choice> {
  std::iter::once(none_choice()).chain(choices).collect()
}

fn status_choices() -> Vec<Choice> {
  NegotiationStatus::iter()
    .map(|s| Choice::new(s.to_string(), s.wire_value()))
    .collect()
}

fn company_choices(data: &Data) -> Vec<Choice> {
  with_none(
    data
      .companies
      .iter()
      .filter_map(|c| c.id.map(|id| Choice::new(id.to_string(), c.option_label()))),
  )
}

fn union_choices(data: &Data) -> Vec<Choice> {
  with_none(
    data
      .unions
      .iter()
      .filter_map(|u| u.id.map(|id| Choice::new(id.to_string(), u.name.clone()))),
  )
}

fn mining_choices(data: &Data) -> Vec<Choice> {
  with_none(
    data
      .mining
      .iter()
      .filter_map(|m| m.id.map(|id| Choice::new(id.to_string(), m.name.clone()))),
  )
}

fn negotiation_choices(data: &Data) -> Vec<Choice> {
  with_none(data.negotiations.iter().filter_map(|n| {
    n.id
      .server()
      .map(|id| Choice::new(id, n.option_label()))
  }))
}

fn role_choices(data: &Data) -> Vec<Choice> {
  with_none(
    data
      .roles
      .iter()
      .filter_map(|r| r.id.map(|id| Choice::new(id.to_string(), r.name.clone()))),
  )
}

// ─── Forms ────────────────────────────────────────────────────────────────────

/// An empty create form for `page`, or `None` if the page is read-only.
pub fn new_form(page: Page, data: &Data) -> Option<Form> {
  let form = match page {
    Page::Negotiations => negotiation_form(data, None, &NegotiationDraft::default()),
    Page::Companies => company_form(data, None, &CompanyDraft::default()),
    Page::MiningOperators => mining_form(None, &MiningDraft::default()),
    Page::Unions => union_form(None, &UnionDraft::default()),
    Page::Users => user_form(data, None, &UserDraft::default()),
    Page::Monitoring => monitoring_form(data, None, &MonitoringDraft::default()),
    Page::Listing | Page::Reports => return None,
  };
  Some(form)
}

/// An edit form for the record with server id `id` on `page`, prefilled from
/// the loaded data. Records the server sent without an id never match.
pub fn edit_form(page: Page, data: &Data, id: &str) -> Option<Form> {
  let numeric: Option<i64> = id.parse().ok();
  let matches = |record: Option<i64>| record.is_some() && record == numeric;
  match page {
    Page::Negotiations => data
      .negotiations
      .iter()
      .find(|n| n.id.server() == Some(id))
      .map(|n| negotiation_form(data, Some(id.to_owned()), &NegotiationDraft::from_row(n))),
    Page::Companies => data
      .companies
      .iter()
      .find(|c| matches(c.id))
      .map(|c| company_form(data, c.id, &CompanyDraft::from_company(c))),
    Page::MiningOperators => data.mining.iter().find(|m| matches(m.id)).map(|m| {
      mining_form(m.id, &MiningDraft {
        name: m.name.clone(),
      })
    }),
    Page::Unions => data
      .unions
      .iter()
      .find(|u| matches(u.id))
      .map(|u| union_form(u.id, &UnionDraft::from_union(u))),
    Page::Users => data
      .users
      .iter()
      .find(|u| matches(u.id))
      .map(|u| user_form(data, u.id, &UserDraft::from_user(u))),
    Page::Monitoring => data
      .monitoring
      .iter()
      .find(|m| matches(m.entry.id))
      .map(|m| monitoring_form(data, m.entry.id, &MonitoringDraft::from_entry(&m.entry))),
    Page::Listing | Page::Reports => None,
  }
}

fn title(noun: &str, editing: bool) -> String {
  if editing { format!("Edit {noun}") } else { format!("New {noun}") }
}

fn negotiation_form(data: &Data, editing: Option<String>, d: &NegotiationDraft) -> Form {
  Form::new(
    FormKind::Negotiation {
      editing: editing.clone(),
    },
    title("negotiation", editing.is_some()),
    vec![
      Field::select("id_empresa", "Company", &d.company_id, company_choices(data)),
      Field::select("id_sindicato", "Union", &d.union_id, union_choices(data)),
      Field::text("contrato", "Contract", &d.contract),
      Field::select("estado", "Status", d.status.to_string(), status_choices()),
      Field::text("fecha_inicio", "Start (YYYY-MM-DD)", &d.start_date),
      Field::text("fecha_termino", "Term (YYYY-MM-DD)", &d.term_date),
      Field::text(
        "vencimiento_contrato_comercial",
        "Commercial expiry",
        &d.expiry_date,
      ),
      Field::text("dotacion_total", "Total headcount", &d.total_headcount),
      Field::text(
        "personal_sindicalizado",
        "Unionized headcount",
        &d.unionized_headcount,
      ),
      Field::text("porcentaje_sindicalizado", "Unionized %", &d.unionized_pct),
    ],
  )
}

fn company_form(data: &Data, editing: Option<i64>, d: &CompanyDraft) -> Form {
  Form::new(
    FormKind::Company { editing },
    title("company", editing.is_some()),
    vec![
      Field::text("nombre_empresa", "Name", &d.name),
      Field::text("rut_empresa", "Tax id", &d.tax_id),
      Field::select("id_minera", "Mining operator", &d.mining_id, mining_choices(data)),
    ],
  )
}

fn mining_form(editing: Option<i64>, d: &MiningDraft) -> Form {
  Form::new(
    FormKind::Mining { editing },
    title("mining operator", editing.is_some()),
    vec![Field::text("nombre_minera", "Name", &d.name)],
  )
}

fn union_form(editing: Option<i64>, d: &UnionDraft) -> Form {
  let kinds = with_none(UnionKind::iter().map(|k| Choice::new(k.to_string(), k.to_string())));
  Form::new(
    FormKind::Union { editing },
    title("union", editing.is_some()),
    vec![
      Field::text("nombre_sindicato", "Name", &d.name),
      Field::text("federacion", "Federation", &d.federation),
      Field::select("tipo_sindicato", "Type", &d.kind, kinds),
    ],
  )
}

fn user_form(data: &Data, editing: Option<i64>, d: &UserDraft) -> Form {
  let mut fields = vec![
    Field::text("nombre", "Name", &d.name),
    Field::text("apellido", "Surname", &d.surname),
    Field::text("email", "Email", &d.email),
    Field::text("usuario", "Handle", &d.handle),
    Field::select("id_rol", "Role", &d.role_id, role_choices(data)),
  ];
  if editing.is_none() {
    fields.push(Field::secret("contrasena", "Password"));
  }
  Form::new(
    FormKind::User { editing },
    title("user", editing.is_some()),
    fields,
  )
}

fn monitoring_form(data: &Data, editing: Option<i64>, d: &MonitoringDraft) -> Form {
  Form::new(
    FormKind::Monitoring { editing },
    title("monitoring entry", editing.is_some()),
    vec![
      Field::select(
        "id_negociacion",
        "Negotiation",
        &d.negotiation_id,
        negotiation_choices(data),
      ),
      Field::text("fecha_inicio_monitoreo", "Start (YYYY-MM-DD)", &d.start_date),
      Field::text("comentarios", "Comments", &d.comments),
    ],
  )
}

/// Report criteria form, prefilled from `current`.
pub fn report_form(data: &Data, current: &ReportFilter) -> Form {
  let mut mining: Vec<&str> = data
    .negotiations
    .iter()
    .map(|n| n.mining.as_str())
    .filter(|m| !m.is_empty())
    .collect();
  mining.sort_unstable();
  mining.dedup();

  let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
  Form::new(
    FormKind::ReportFilter,
    "Report filters",
    vec![
      Field::select(
        "minera",
        "Mining operator",
        &current.mining,
        with_none(mining.into_iter().map(|m| Choice::new(m, m))),
      ),
      Field::select(
        "estado",
        "Status",
        current.status.to_lowercase(),
        with_none(status_choices()),
      ),
      Field::text("rut_empresa", "Tax id contains", &current.tax_id),
      Field::text("contrato", "Contract contains", &current.contract),
      Field::text("desde", "From (YYYY-MM-DD)", date(current.from)),
      Field::text("hasta", "To (YYYY-MM-DD)", date(current.to)),
    ],
  )
}

// ─── Drafts from forms ────────────────────────────────────────────────────────

pub fn negotiation_draft(form: &Form) -> NegotiationDraft {
  NegotiationDraft {
    company_id:          form.value("id_empresa").to_owned(),
    union_id:            form.value("id_sindicato").to_owned(),
    contract:            form.value("contrato").to_owned(),
    status:              NegotiationStatus::from_str(form.value("estado")).unwrap_or_default(),
    start_date:          form.value("fecha_inicio").to_owned(),
    term_date:           form.value("fecha_termino").to_owned(),
    expiry_date:         form.value("vencimiento_contrato_comercial").to_owned(),
    total_headcount:     form.value("dotacion_total").to_owned(),
    unionized_headcount: form.value("personal_sindicalizado").to_owned(),
    unionized_pct:       form.value("porcentaje_sindicalizado").to_owned(),
  }
}

pub fn company_draft(form: &Form) -> CompanyDraft {
  CompanyDraft {
    name:      form.value("nombre_empresa").to_owned(),
    tax_id:    form.value("rut_empresa").to_owned(),
    mining_id: form.value("id_minera").to_owned(),
  }
}

pub fn mining_draft(form: &Form) -> MiningDraft {
  MiningDraft {
    name: form.value("nombre_minera").to_owned(),
  }
}

pub fn union_draft(form: &Form) -> UnionDraft {
  UnionDraft {
    name:       form.value("nombre_sindicato").to_owned(),
    federation: form.value("federacion").to_owned(),
    kind:       form.value("tipo_sindicato").to_owned(),
  }
}

pub fn user_draft(form: &Form) -> UserDraft {
  UserDraft {
    name:     form.value("nombre").to_owned(),
    surname:  form.value("apellido").to_owned(),
    email:    form.value("email").to_owned(),
    handle:   form.value("usuario").to_owned(),
    role_id:  form.value("id_rol").to_owned(),
    password: form.value("contrasena").to_owned(),
  }
}

pub fn monitoring_draft(form: &Form) -> MonitoringDraft {
  MonitoringDraft {
    negotiation_id: form.value("id_negociacion").to_owned(),
    start_date:     form.value("fecha_inicio_monitoreo").to_owned(),
    comments:       form.value("comentarios").to_owned(),
  }
}

/// Read the report form back into criteria. Dates must be strict when given.
pub fn report_filter(form: &Form) -> Result<ReportFilter, ValidationError> {
  let date = |key: &'static str| {
    let raw = form.value(key).trim();
    if raw.is_empty() {
      return Ok(None);
    }
    parse_strict_date(raw)
      .map(Some)
      .ok_or_else(|| ValidationError::new(key, "Check the date format (YYYY-MM-DD)."))
  };
  Ok(ReportFilter {
    mining:   form.value("minera").to_owned(),
    status:   form.value("estado").to_owned(),
    tax_id:   form.value("rut_empresa").trim().to_owned(),
    contract: form.value("contrato").trim().to_owned(),
    from:     date("desde")?,
    to:       date("hasta")?,
  })
}

/// Fill in the suggested term date of a negotiation form. Call after the
/// start date or the status changed; a term already entered is kept.
pub fn suggest_term(form: &mut Form) {
  let status = NegotiationStatus::from_str(form.value("estado")).unwrap_or_default();
  let term = suggest_term_date(
    status,
    form.value("fecha_inicio"),
    form.value("fecha_termino"),
  );
  if let Some(term) = term {
    form.set("fecha_termino", term);
  }
}
