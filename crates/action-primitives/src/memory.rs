//! In-memory page driver
//!
//! A scripted document with no browser behind it. Elements are matched with
//! the same selector grammar real drivers receive, actions mutate the
//! document, and per-element reactions emulate page behaviour such as a cart
//! badge updating after a click. Used for dry runs and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use testpilot_core_types::{ElementRef, LocatorDescriptor};

use crate::driver::{BrowserContext, PageDriver};
use crate::errors::DriverError;
use crate::locator::Selector;
use crate::types::{ElementOp, ElementQuery, ElementTraits, QueryValue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryElement {
    /// Raw page address (css or xpath) as a snapshot map would report it
    pub address: String,
    pub backend_node_id: i64,
    pub role: Option<String>,
    pub name: Option<String>,
    pub text: String,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub test_id: Option<String>,
    pub value: String,
    pub visible: bool,
    pub enabled: bool,
    pub checked: bool,
    pub attributes: BTreeMap<String, String>,
}

impl MemoryElement {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            backend_node_id: 0,
            role: None,
            name: None,
            text: String::new(),
            label: None,
            placeholder: None,
            test_id: None,
            value: String::new(),
            visible: true,
            enabled: true,
            checked: false,
            attributes: BTreeMap::new(),
        }
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn test_id(mut self, test_id: impl Into<String>) -> Self {
        self.test_id = Some(test_id.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    fn matches(&self, selector: &Selector) -> bool {
        match selector {
            Selector::Role { role, name } => {
                self.role.as_deref() == Some(role.as_str())
                    && name
                        .as_deref()
                        .map(|name| self.name.as_deref() == Some(name))
                        .unwrap_or(true)
            }
            Selector::Text(text) => !self.text.is_empty() && self.text.trim() == text.trim(),
            Selector::Label(label) => self.label.as_deref() == Some(label.as_str()),
            Selector::Placeholder(value) => self.placeholder.as_deref() == Some(value.as_str()),
            Selector::TestId(id) => self.test_id.as_deref() == Some(id.as_str()),
            Selector::Css(address) | Selector::Xpath(address) => self.address == *address,
        }
    }

    fn traits(&self) -> ElementTraits {
        ElementTraits {
            role: self.role.clone(),
            name: self.name.clone(),
            text: Some(self.text.trim().to_string()).filter(|text| !text.is_empty()),
            label: self.label.clone(),
            placeholder: self.placeholder.clone(),
            test_id: self.test_id.clone(),
        }
    }

    fn attribute_value(&self, name: &str) -> Option<String> {
        match name {
            "data-testid" => self.test_id.clone(),
            "placeholder" => self.placeholder.clone(),
            "aria-label" => self.label.clone(),
            "role" => self.role.clone(),
            "value" => Some(self.value.clone()),
            _ => self.attributes.get(name).cloned(),
        }
    }
}

/// Document state behind a [`MemoryPage`].
#[derive(Debug, Clone, Default)]
pub struct MemoryDom {
    pub url: String,
    pub elements: Vec<MemoryElement>,
    pub focused: Option<String>,
    next_node_id: i64,
}

impl MemoryDom {
    pub fn element(&self, address: &str) -> Option<&MemoryElement> {
        self.elements.iter().find(|el| el.address == address)
    }

    pub fn element_mut(&mut self, address: &str) -> Option<&mut MemoryElement> {
        self.elements.iter_mut().find(|el| el.address == address)
    }

    /// Append an element, assigning it the next backend node id.
    pub fn insert(&mut self, mut element: MemoryElement) {
        self.next_node_id += 1;
        element.backend_node_id = self.next_node_id;
        self.elements.push(element);
    }

    pub fn remove(&mut self, address: &str) {
        self.elements.retain(|el| el.address != address);
    }
}

type Reaction = Arc<dyn Fn(&mut MemoryDom) + Send + Sync>;

#[derive(Default)]
pub struct MemoryPage {
    dom: Mutex<MemoryDom>,
    reactions: Mutex<HashMap<(String, &'static str), Reaction>>,
    log: Mutex<Vec<String>>,
    action_delay: Mutex<Duration>,
    settle_delay: Mutex<Duration>,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(self, element: MemoryElement) -> Self {
        self.dom.lock().insert(element);
        self
    }

    /// Run `reaction` against the document after `op` succeeds on the element
    /// at `address`.
    pub fn on_action<F>(&self, address: &str, op: &'static str, reaction: F)
    where
        F: Fn(&mut MemoryDom) + Send + Sync + 'static,
    {
        self.reactions
            .lock()
            .insert((address.to_string(), op), Arc::new(reaction));
    }

    pub fn on_click<F>(&self, address: &str, reaction: F)
    where
        F: Fn(&mut MemoryDom) + Send + Sync + 'static,
    {
        self.on_action(address, "click", reaction);
    }

    /// Delay every element operation, to exercise executor timeouts.
    pub fn set_action_delay(&self, delay: Duration) {
        *self.action_delay.lock() = delay;
    }

    pub fn set_settle_delay(&self, delay: Duration) {
        *self.settle_delay.lock() = delay;
    }

    pub fn with_dom<R>(&self, f: impl FnOnce(&mut MemoryDom) -> R) -> R {
        f(&mut self.dom.lock())
    }

    /// Driver calls in order, e.g. `click [data-testid="add-to-cart"]`.
    pub fn actions(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    /// Simplified accessibility outline of the visible elements plus the
    /// reference → address map for the same snapshot.
    pub fn accessibility_outline(&self) -> (String, Vec<(ElementRef, String)>) {
        let dom = self.dom.lock();
        let mut lines = Vec::new();
        let mut refs = Vec::new();
        for element in dom.elements.iter().filter(|el| el.visible) {
            let element_ref = ElementRef::new(0, element.backend_node_id);
            let role = element.role.as_deref().unwrap_or("generic");
            let label = element
                .name
                .as_deref()
                .or(element.label.as_deref())
                .or(element.placeholder.as_deref())
                .unwrap_or(element.text.trim());
            lines.push(format!("[{}] {} \"{}\"", element_ref, role, label));
            refs.push((element_ref, element.address.clone()));
        }
        (lines.join("\n"), refs)
    }

    fn record(&self, entry: String) {
        self.log.lock().push(entry);
    }

    fn single<'a>(
        dom: &'a MemoryDom,
        locator: &LocatorDescriptor,
    ) -> Result<&'a MemoryElement, DriverError> {
        let selector = Selector::from_descriptor(locator);
        let mut matches = dom.elements.iter().filter(|el| el.matches(&selector));
        let first = matches
            .next()
            .ok_or_else(|| DriverError::ElementNotFound(locator.address.clone()))?;
        if matches.next().is_some() {
            return Err(DriverError::Ambiguous(locator.address.clone()));
        }
        Ok(first)
    }
}

#[async_trait]
impl PageDriver for MemoryPage {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        if url.trim().is_empty() {
            return Err(DriverError::Navigation("empty url".to_string()));
        }
        self.dom.lock().url = url.to_string();
        self.record(format!("navigate {}", url));
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.dom.lock().url.clone())
    }

    async fn perform(&self, locator: &LocatorDescriptor, op: &ElementOp) -> Result<(), DriverError> {
        let delay = *self.action_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let reaction = {
            let mut dom = self.dom.lock();
            let address = Self::single(&dom, locator)?.address.clone();
            let needs_interaction = !matches!(
                op,
                ElementOp::Hover | ElementOp::Focus | ElementOp::Blur | ElementOp::ScrollIntoView
            );

            let Some(element) = dom.element_mut(&address) else {
                return Err(DriverError::Detached(address));
            };
            if needs_interaction && (!element.visible || !element.enabled) {
                return Err(DriverError::NotInteractable(locator.address.clone()));
            }
            match op {
                ElementOp::Fill(value) | ElementOp::SelectOption(value) => {
                    element.value = value.clone()
                }
                ElementOp::TypeSequentially(value) => element.value.push_str(value),
                ElementOp::Clear => element.value.clear(),
                ElementOp::Check => element.checked = true,
                ElementOp::Uncheck => element.checked = false,
                _ => {}
            }
            match op {
                ElementOp::Focus
                | ElementOp::Click
                | ElementOp::Fill(_)
                | ElementOp::TypeSequentially(_) => dom.focused = Some(address.clone()),
                ElementOp::Blur => dom.focused = None,
                _ => {}
            }

            self.reactions.lock().get(&(address, op.name())).cloned()
        };

        if let Some(reaction) = reaction {
            reaction(&mut self.dom.lock());
        }
        self.record(format!("{} {}", op.name(), locator.address));
        Ok(())
    }

    async fn query(
        &self,
        locator: &LocatorDescriptor,
        query: &ElementQuery,
    ) -> Result<QueryValue, DriverError> {
        let dom = self.dom.lock();
        let element = Self::single(&dom, locator)?;
        let value = match query {
            ElementQuery::Visible => QueryValue::Flag(element.visible),
            ElementQuery::Enabled => QueryValue::Flag(element.enabled),
            ElementQuery::Checked => QueryValue::Flag(element.checked),
            ElementQuery::Focused => {
                QueryValue::Flag(dom.focused.as_deref() == Some(element.address.as_str()))
            }
            ElementQuery::InnerText => QueryValue::Text(Some(element.text.clone())),
            ElementQuery::InputValue => QueryValue::Text(Some(element.value.clone())),
            ElementQuery::Attribute(name) => QueryValue::Text(element.attribute_value(name)),
        };
        Ok(value)
    }

    async fn count(&self, locator: &LocatorDescriptor) -> Result<usize, DriverError> {
        let selector = Selector::from_descriptor(locator);
        let dom = self.dom.lock();
        Ok(dom.elements.iter().filter(|el| el.matches(&selector)).count())
    }

    async fn describe(&self, address: &str) -> Result<Option<ElementTraits>, DriverError> {
        Ok(self.dom.lock().element(address).map(MemoryElement::traits))
    }

    async fn wait_for_settled(&self, timeout: Duration) -> Result<(), DriverError> {
        let delay = *self.settle_delay.lock();
        if delay > timeout {
            tokio::time::sleep(timeout).await;
            return Err(DriverError::SettleTimeout(format!(
                "still busy after {}ms",
                timeout.as_millis()
            )));
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    /// Deterministic stand-in for pixels: the url plus every visible text.
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        let dom = self.dom.lock();
        let mut frame = dom.url.clone();
        for element in dom.elements.iter().filter(|el| el.visible) {
            frame.push('\n');
            frame.push_str(element.text.trim());
            frame.push('|');
            frame.push_str(&element.value);
        }
        Ok(frame.into_bytes())
    }
}

/// Browser context handing out [`MemoryPage`]s.
#[derive(Default)]
pub struct MemoryContext {
    pages: Mutex<Vec<Arc<MemoryPage>>>,
}

impl MemoryContext {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BrowserContext for MemoryContext {
    type Page = MemoryPage;

    async fn new_page(&self) -> Result<Arc<MemoryPage>, DriverError> {
        let page = Arc::new(MemoryPage::new());
        self.pages.lock().push(page.clone());
        Ok(page)
    }

    async fn pages(&self) -> Result<Vec<Arc<MemoryPage>>, DriverError> {
        Ok(self.pages.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testpilot_core_types::{LocatorStrategy, Reliability};

    fn test_id(id: &str) -> LocatorDescriptor {
        LocatorDescriptor::new(
            Selector::TestId(id.to_string()).address(),
            LocatorStrategy::TestId,
            Reliability::High,
        )
    }

    #[tokio::test]
    async fn click_fires_reaction() {
        let page = MemoryPage::new()
            .with_element(MemoryElement::new("#add").role("button").test_id("add"))
            .with_element(MemoryElement::new("#badge").text("Cart (0)"));
        page.on_click("#add", |dom| {
            if let Some(badge) = dom.element_mut("#badge") {
                badge.text = "Cart (1)".to_string();
            }
        });

        page.perform(&test_id("add"), &ElementOp::Click).await.unwrap();
        let text = page
            .query(&LocatorDescriptor::literal("#badge"), &ElementQuery::InnerText)
            .await
            .unwrap();
        assert_eq!(text.into_text().as_deref(), Some("Cart (1)"));
        assert_eq!(page.actions(), vec!["click [data-testid=\"add\"]".to_string()]);
    }

    #[tokio::test]
    async fn disabled_element_rejects_click() {
        let page = MemoryPage::new().with_element(MemoryElement::new("#buy").disabled());
        let err = page
            .perform(&LocatorDescriptor::literal("#buy"), &ElementOp::Click)
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::NotInteractable(_)));
    }

    #[tokio::test]
    async fn ambiguous_locator_is_rejected() {
        let page = MemoryPage::new()
            .with_element(MemoryElement::new("#a").role("button").name("Buy"))
            .with_element(MemoryElement::new("#b").role("button").name("Buy"));
        let locator = LocatorDescriptor::new(
            "role=button[name=\"Buy\"]",
            LocatorStrategy::Role,
            Reliability::High,
        );
        assert_eq!(page.count(&locator).await.unwrap(), 2);
        assert!(matches!(
            page.perform(&locator, &ElementOp::Click).await,
            Err(DriverError::Ambiguous(_))
        ));
    }

    #[test]
    fn outline_lists_visible_elements_with_refs() {
        let page = MemoryPage::new()
            .with_element(MemoryElement::new("#q").role("searchbox").placeholder("Search"))
            .with_element(MemoryElement::new("#secret").hidden());
        let (tree, refs) = page.accessibility_outline();
        assert_eq!(tree, "[0-1] searchbox \"Search\"");
        assert_eq!(refs, vec![(ElementRef::new(0, 1), "#q".to_string())]);
    }
}
