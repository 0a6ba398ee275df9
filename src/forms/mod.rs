//! Form tabs: the catalog of available forms and the tab strip that mounts
//! one session at a time.

pub mod builtin;

use serde_json::Value;
use tracing::info;

use crate::schema::document::parse_node;
use crate::schema::{SchemaError, SchemaNode};
use crate::session::{FormSession, SessionError};

pub const BUSINESS_TAB: &str = "business";
pub const LOAN_TAB: &str = "loan";

/// A named form shown as one tab
#[derive(Debug, Clone, PartialEq)]
pub struct TabDefinition {
    name: String,
    title: String,
    schema: SchemaNode,
}

impl TabDefinition {
    pub fn new(name: impl Into<String>, title: impl Into<String>, schema: impl Into<SchemaNode>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            schema: schema.into(),
        }
    }

    /// Build a tab from a JSON Schema document. Without an explicit title the
    /// schema's own title is used, then the tab name.
    pub fn from_document(name: &str, title: Option<&str>, doc: &Value) -> Result<Self, SchemaError> {
        let schema = parse_node(doc)?;
        let title = title
            .or_else(|| schema.title())
            .unwrap_or(name)
            .to_string();
        Ok(Self::new(name, title, schema))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn schema(&self) -> &SchemaNode {
        &self.schema
    }

    /// Open a fresh session on this form.
    pub fn open(&self) -> FormSession {
        FormSession::new(self.schema.clone())
    }
}

/// Ordered set of tabs, looked up by name
#[derive(Debug, Clone, Default)]
pub struct FormCatalog {
    tabs: Vec<TabDefinition>,
}

impl FormCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The business and loan tabs, in that order.
    pub fn builtin() -> Result<Self, SchemaError> {
        let mut catalog = Self::new();
        catalog.register(TabDefinition::new(BUSINESS_TAB, "Business Details", builtin::business_details()?));
        catalog.register(TabDefinition::new(LOAN_TAB, "Loan Details", builtin::loan_details()?));
        Ok(catalog)
    }

    /// Add a tab, replacing any tab of the same name in place.
    pub fn register(&mut self, tab: TabDefinition) -> Option<TabDefinition> {
        match self.tabs.iter_mut().find(|t| t.name == tab.name) {
            Some(slot) => Some(std::mem::replace(slot, tab)),
            None => {
                self.tabs.push(tab);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&TabDefinition> {
        self.tabs.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tabs.iter().map(|t| t.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &TabDefinition> {
        self.tabs.iter()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}

/// Tab strip with lazily mounted sessions. Only the active tab holds a
/// session; leaving a tab discards its input.
#[derive(Debug)]
pub struct FormTabs {
    catalog: FormCatalog,
    active: Option<(String, FormSession)>,
}

impl FormTabs {
    pub fn new(catalog: FormCatalog) -> Self {
        Self { catalog, active: None }
    }

    pub fn catalog(&self) -> &FormCatalog {
        &self.catalog
    }

    /// Switch to `name`, mounting a new session unless it is already active.
    pub fn select(&mut self, name: &str) -> Result<&mut FormSession, SessionError> {
        let already_active = matches!(&self.active, Some((active, _)) if active == name);
        if !already_active {
            let tab = self
                .catalog
                .get(name)
                .ok_or_else(|| SessionError::UnknownTab(name.to_string()))?;
            if let Some((previous, _)) = &self.active {
                info!("Unmounting tab '{}'", previous);
            }
            info!("Mounting tab '{}'", name);
            self.active = Some((name.to_string(), tab.open()));
        }

        match &mut self.active {
            Some((_, session)) => Ok(session),
            None => Err(SessionError::UnknownTab(name.to_string())),
        }
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_ref().map(|(name, _)| name.as_str())
    }

    pub fn active(&self) -> Option<&FormSession> {
        self.active.as_ref().map(|(_, session)| session)
    }

    pub fn active_mut(&mut self) -> Option<&mut FormSession> {
        self.active.as_mut().map(|(_, session)| session)
    }
}
