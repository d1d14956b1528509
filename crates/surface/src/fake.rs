//! In-memory page double for tests.
//!
//! `FakePage` models a mutating single-page app: elements can be scheduled to
//! appear, disappear or toggle visibility at a point in time, clicks and key
//! presses can trigger delayed effects, and a network-activity clock feeds the
//! quiet-window signal. Combined with tokio's paused clock this makes poll and
//! deadline boundaries deterministic in tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::Instant;
use waybill_core_types::{DocumentReady, ElementId, FrameId, ScopeId, SelectorCandidate};

use crate::errors::SurfaceError;
use crate::page::{BrowserSurface, DialogEvent, ElementHandle, PageSurface};

/// One element in the fake DOM.
#[derive(Debug, Clone)]
pub struct FakeElement {
    pub id: ElementId,
    matchers: Vec<String>,
    role: Option<(String, String)>,
    text: Option<String>,
    attrs: BTreeMap<String, String>,
    visible: bool,
    covered: bool,
}

impl FakeElement {
    pub fn new(id: &str) -> Self {
        Self {
            id: ElementId(id.to_string()),
            matchers: Vec::new(),
            role: None,
            text: None,
            attrs: BTreeMap::new(),
            visible: true,
            covered: false,
        }
    }

    /// Declare a raw CSS/XPath expression this element matches.
    pub fn matches(mut self, expr: &str) -> Self {
        self.matchers.push(expr.to_string());
        self
    }

    /// Declare the element's ARIA role and accessible name.
    pub fn role(mut self, role: &str, name: &str) -> Self {
        self.role = Some((role.to_string(), name.to_string()));
        self
    }

    /// Declare the element's rendered text content.
    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    /// Set an attribute (name/aria-label/placeholder/type and friends).
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn covered(mut self) -> Self {
        self.covered = true;
        self
    }

    fn matches_candidate(&self, candidate: &SelectorCandidate) -> bool {
        match candidate {
            SelectorCandidate::Css(expr) | SelectorCandidate::XPath(expr) => {
                self.matchers.iter().any(|m| m == expr)
            }
            SelectorCandidate::Role { role, name } => match &self.role {
                Some((r, n)) => {
                    r.eq_ignore_ascii_case(role) && n.eq_ignore_ascii_case(name)
                }
                None => false,
            },
            SelectorCandidate::Text { content, exact } => match &self.text {
                Some(text) => {
                    let text = text.to_lowercase();
                    let needle = content.to_lowercase();
                    if *exact {
                        text == needle
                    } else {
                        text.contains(&needle)
                    }
                }
                None => false,
            },
        }
    }
}

/// A deferred change to the fake page, applied when its due time passes.
#[derive(Debug, Clone)]
pub enum FakeMutation {
    /// Attach a new element to a scope.
    Append { scope: ScopeId, element: FakeElement },

    /// Detach an element wherever it lives.
    Remove(ElementId),

    /// Toggle an element's rendered visibility.
    SetVisible(ElementId, bool),

    /// Detach a whole sub-document.
    DetachFrame(FrameId),

    /// Change the main document's URL.
    SetUrl(String),

    /// Advance or regress the readiness ladder.
    SetReady(DocumentReady),

    /// Mark the network busy for a further duration from the due time.
    NetworkBusy(Duration),

    /// Raise a dialog.
    Dialog(String),
}

/// Record of one action the page received, for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    pub element: ElementId,
    pub kind: String,
    pub detail: Option<String>,
}

#[derive(Debug)]
struct FakeScope {
    id: ScopeId,
    attached: bool,
    elements: Vec<FakeElement>,
}

struct PageState {
    url: String,
    ready: DocumentReady,
    scopes: Vec<FakeScope>,
    pending: Vec<(Instant, FakeMutation)>,
    network_busy_until: Instant,
    invalid: HashSet<String>,
    on_click: HashMap<ElementId, Vec<(Duration, FakeMutation)>>,
    on_press: HashMap<ElementId, Vec<(Duration, FakeMutation)>>,
    log: Vec<ActionRecord>,
    closed: bool,
}

/// In-memory [`PageSurface`] implementation.
pub struct FakePage {
    state: Mutex<PageState>,
    dialog_tx: broadcast::Sender<DialogEvent>,
}

impl FakePage {
    pub fn builder() -> FakePageBuilder {
        FakePageBuilder::new()
    }

    fn state(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Schedule a mutation `after` the current (possibly paused) time.
    pub fn schedule(&self, after: Duration, mutation: FakeMutation) {
        let mut st = self.state();
        st.pending.push((Instant::now() + after, mutation));
    }

    /// Register an effect that fires `after` a click on `element`.
    pub fn on_click(&self, element: &str, after: Duration, mutation: FakeMutation) {
        let mut st = self.state();
        st.on_click
            .entry(ElementId(element.to_string()))
            .or_default()
            .push((after, mutation));
    }

    /// Register an effect that fires `after` a key press on `element`.
    pub fn on_press(&self, element: &str, after: Duration, mutation: FakeMutation) {
        let mut st = self.state();
        st.on_press
            .entry(ElementId(element.to_string()))
            .or_default()
            .push((after, mutation));
    }

    /// Mark the network busy for `duration` from now.
    pub fn set_network_busy(&self, duration: Duration) {
        let mut st = self.state();
        let until = Instant::now() + duration;
        if until > st.network_busy_until {
            st.network_busy_until = until;
        }
    }

    /// Raise a dialog immediately.
    pub fn emit_dialog(&self, message: &str) {
        let _ = self.dialog_tx.send(DialogEvent {
            message: message.to_string(),
        });
    }

    /// Everything the page has been asked to do, in order.
    pub fn actions(&self) -> Vec<ActionRecord> {
        self.apply_due_and_dialogs();
        self.state().log.clone()
    }

    /// How many actions of `kind` the element received.
    pub fn count_actions(&self, element: &str, kind: &str) -> usize {
        self.actions()
            .iter()
            .filter(|r| r.element.0 == element && r.kind == kind)
            .count()
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    fn apply_due(st: &mut PageState) {
        let now = Instant::now();
        let mut due: Vec<(Instant, FakeMutation)> = Vec::new();
        st.pending.retain(|(at, m)| {
            if *at <= now {
                due.push((*at, m.clone()));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|(at, _)| *at);
        for (at, mutation) in due {
            Self::apply(st, at, mutation);
        }
    }

    fn apply(st: &mut PageState, at: Instant, mutation: FakeMutation) {
        match mutation {
            FakeMutation::Append { scope, element } => {
                if let Some(s) = st.scopes.iter_mut().find(|s| s.id == scope) {
                    s.elements.push(element);
                }
            }
            FakeMutation::Remove(id) => {
                for scope in &mut st.scopes {
                    scope.elements.retain(|e| e.id != id);
                }
            }
            FakeMutation::SetVisible(id, visible) => {
                for scope in &mut st.scopes {
                    for e in &mut scope.elements {
                        if e.id == id {
                            e.visible = visible;
                        }
                    }
                }
            }
            FakeMutation::DetachFrame(frame) => {
                let id = ScopeId::Frame(frame);
                if let Some(s) = st.scopes.iter_mut().find(|s| s.id == id) {
                    s.attached = false;
                }
            }
            FakeMutation::SetUrl(url) => st.url = url,
            FakeMutation::SetReady(ready) => st.ready = ready,
            FakeMutation::NetworkBusy(duration) => {
                let until = at + duration;
                if until > st.network_busy_until {
                    st.network_busy_until = until;
                }
            }
            FakeMutation::Dialog(_) => {
                // handled by the caller, which owns the sender
            }
        }
    }

    fn apply_due_and_dialogs(&self) {
        // Dialog mutations need the broadcast sender, so they are split out of
        // the pure state mutation path.
        let due_dialogs: Vec<String> = {
            let mut st = self.state();
            let now = Instant::now();
            let mut dialogs = Vec::new();
            st.pending.retain(|(at, m)| {
                if *at <= now {
                    if let FakeMutation::Dialog(msg) = m {
                        dialogs.push((*at, msg.clone()));
                        return false;
                    }
                }
                true
            });
            Self::apply_due(&mut st);
            dialogs.sort_by_key(|(at, _)| *at);
            dialogs.into_iter().map(|(_, msg)| msg).collect()
        };
        for message in due_dialogs {
            let _ = self.dialog_tx.send(DialogEvent { message });
        }
    }

    fn find_element<'a>(
        st: &'a PageState,
        handle: &ElementHandle,
    ) -> Option<&'a FakeElement> {
        st.scopes
            .iter()
            .find(|s| s.id == handle.scope && s.attached)?
            .elements
            .iter()
            .find(|e| e.id == handle.element)
    }

    fn require_element<'a>(
        st: &'a PageState,
        handle: &ElementHandle,
    ) -> Result<&'a FakeElement, SurfaceError> {
        Self::find_element(st, handle)
            .ok_or_else(|| SurfaceError::StaleElement(handle.element.0.clone()))
    }

    fn guard_open(st: &PageState) -> Result<(), SurfaceError> {
        if st.closed {
            Err(SurfaceError::PageClosed)
        } else {
            Ok(())
        }
    }

    fn record(
        st: &mut PageState,
        handle: &ElementHandle,
        kind: &str,
        detail: Option<String>,
    ) {
        st.log.push(ActionRecord {
            element: handle.element.clone(),
            kind: kind.to_string(),
            detail,
        });
    }

    fn act(
        &self,
        handle: &ElementHandle,
        kind: &str,
        detail: Option<String>,
        effects: fn(&PageState, &ElementId) -> Vec<(Duration, FakeMutation)>,
    ) -> Result<(), SurfaceError> {
        self.apply_due_and_dialogs();
        let mut st = self.state();
        Self::guard_open(&st)?;
        Self::require_element(&st, handle)?;
        Self::record(&mut st, handle, kind, detail);
        let now = Instant::now();
        for (delay, mutation) in effects(&st, &handle.element) {
            st.pending.push((now + delay, mutation));
        }
        Ok(())
    }
}

fn click_effects(st: &PageState, id: &ElementId) -> Vec<(Duration, FakeMutation)> {
    st.on_click.get(id).cloned().unwrap_or_default()
}

fn press_effects(st: &PageState, id: &ElementId) -> Vec<(Duration, FakeMutation)> {
    st.on_press.get(id).cloned().unwrap_or_default()
}

fn no_effects(_st: &PageState, _id: &ElementId) -> Vec<(Duration, FakeMutation)> {
    Vec::new()
}

#[async_trait]
impl PageSurface for FakePage {
    async fn goto(&self, url: &str) -> Result<(), SurfaceError> {
        self.apply_due_and_dialogs();
        let mut st = self.state();
        Self::guard_open(&st)?;
        st.url = url.to_string();
        if st.ready < DocumentReady::ContentLoaded {
            st.ready = DocumentReady::ContentLoaded;
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String, SurfaceError> {
        self.apply_due_and_dialogs();
        let st = self.state();
        Self::guard_open(&st)?;
        Ok(st.url.clone())
    }

    async fn ready_state(&self) -> Result<DocumentReady, SurfaceError> {
        self.apply_due_and_dialogs();
        let st = self.state();
        Self::guard_open(&st)?;
        Ok(st.ready)
    }

    async fn network_idle_for(&self) -> Result<Duration, SurfaceError> {
        self.apply_due_and_dialogs();
        let st = self.state();
        Self::guard_open(&st)?;
        Ok(Instant::now().duration_since(st.network_busy_until))
    }

    async fn frames(&self) -> Result<Vec<FrameId>, SurfaceError> {
        self.apply_due_and_dialogs();
        let st = self.state();
        Self::guard_open(&st)?;
        Ok(st
            .scopes
            .iter()
            .filter(|s| s.attached)
            .filter_map(|s| match &s.id {
                ScopeId::Frame(id) => Some(id.clone()),
                ScopeId::Main => None,
            })
            .collect())
    }

    async fn query(
        &self,
        scope: &ScopeId,
        candidate: &SelectorCandidate,
    ) -> Result<Vec<ElementHandle>, SurfaceError> {
        self.apply_due_and_dialogs();
        let st = self.state();
        Self::guard_open(&st)?;

        if let SelectorCandidate::Css(expr) | SelectorCandidate::XPath(expr) = candidate {
            if st.invalid.contains(expr) {
                return Err(SurfaceError::InvalidSelector(expr.clone()));
            }
        }

        let fake_scope = st
            .scopes
            .iter()
            .find(|s| s.id == *scope)
            .filter(|s| s.attached)
            .ok_or_else(|| SurfaceError::FrameDetached(scope.to_string()))?;

        Ok(fake_scope
            .elements
            .iter()
            .filter(|e| e.matches_candidate(candidate))
            .map(|e| ElementHandle::new(scope.clone(), e.id.clone()))
            .collect())
    }

    async fn is_attached(&self, handle: &ElementHandle) -> Result<bool, SurfaceError> {
        self.apply_due_and_dialogs();
        let st = self.state();
        Self::guard_open(&st)?;
        Ok(Self::find_element(&st, handle).is_some())
    }

    async fn is_visible(&self, handle: &ElementHandle) -> Result<bool, SurfaceError> {
        self.apply_due_and_dialogs();
        let st = self.state();
        Self::guard_open(&st)?;
        Ok(Self::find_element(&st, handle).map(|e| e.visible).unwrap_or(false))
    }

    async fn is_covered(&self, handle: &ElementHandle) -> Result<bool, SurfaceError> {
        self.apply_due_and_dialogs();
        let st = self.state();
        Self::guard_open(&st)?;
        Ok(Self::find_element(&st, handle).map(|e| e.covered).unwrap_or(false))
    }

    async fn attribute(
        &self,
        handle: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SurfaceError> {
        self.apply_due_and_dialogs();
        let st = self.state();
        Self::guard_open(&st)?;
        let element = Self::require_element(&st, handle)?;
        Ok(element.attrs.get(name).cloned())
    }

    async fn click(&self, handle: &ElementHandle, force: bool) -> Result<(), SurfaceError> {
        let kind = if force { "force_click" } else { "click" };
        self.act(handle, kind, None, click_effects)
    }

    async fn fill(&self, handle: &ElementHandle, text: &str) -> Result<(), SurfaceError> {
        self.act(handle, "fill", Some(text.to_string()), no_effects)
    }

    async fn clear(&self, handle: &ElementHandle) -> Result<(), SurfaceError> {
        self.act(handle, "clear", None, no_effects)
    }

    async fn hover(&self, handle: &ElementHandle) -> Result<(), SurfaceError> {
        self.act(handle, "hover", None, no_effects)
    }

    async fn type_text(&self, handle: &ElementHandle, text: &str) -> Result<(), SurfaceError> {
        self.act(handle, "type_text", Some(text.to_string()), no_effects)
    }

    async fn select_option(
        &self,
        handle: &ElementHandle,
        value: &str,
    ) -> Result<(), SurfaceError> {
        self.act(handle, "select_option", Some(value.to_string()), no_effects)
    }

    async fn press(&self, handle: &ElementHandle, key: &str) -> Result<(), SurfaceError> {
        self.act(handle, "press", Some(key.to_string()), press_effects)
    }

    fn subscribe_dialogs(&self) -> broadcast::Receiver<DialogEvent> {
        self.dialog_tx.subscribe()
    }

    async fn close(&self) -> Result<(), SurfaceError> {
        let mut st = self.state();
        st.closed = true;
        Ok(())
    }
}

/// Builder for [`FakePage`].
pub struct FakePageBuilder {
    url: String,
    ready: DocumentReady,
    scopes: Vec<FakeScope>,
    invalid: HashSet<String>,
}

impl FakePageBuilder {
    fn new() -> Self {
        Self {
            url: "about:blank".to_string(),
            ready: DocumentReady::Complete,
            scopes: vec![FakeScope {
                id: ScopeId::Main,
                attached: true,
                elements: Vec::new(),
            }],
            invalid: HashSet::new(),
        }
    }

    pub fn url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn ready(mut self, ready: DocumentReady) -> Self {
        self.ready = ready;
        self
    }

    /// Add an element to the main document.
    pub fn element(mut self, element: FakeElement) -> Self {
        self.scopes[0].elements.push(element);
        self
    }

    /// Add a sub-document with its elements, in attachment order.
    pub fn frame(mut self, frame: &str, elements: Vec<FakeElement>) -> Self {
        self.scopes.push(FakeScope {
            id: ScopeId::Frame(FrameId(frame.to_string())),
            attached: true,
            elements,
        });
        self
    }

    /// Make the page reject this raw expression as syntactically invalid.
    pub fn invalid_selector(mut self, expr: &str) -> Self {
        self.invalid.insert(expr.to_string());
        self
    }

    /// Build the page and start its mutation pump. Must run inside a tokio
    /// runtime; the pump flushes due mutations (dialogs included) the way a
    /// real driver pushes events, and stops once the page closes.
    pub fn build(self) -> Arc<FakePage> {
        let (dialog_tx, _) = broadcast::channel(16);
        let page = Arc::new(FakePage {
            state: Mutex::new(PageState {
                url: self.url,
                ready: self.ready,
                scopes: self.scopes,
                pending: Vec::new(),
                network_busy_until: Instant::now(),
                invalid: self.invalid,
                on_click: HashMap::new(),
                on_press: HashMap::new(),
                log: Vec::new(),
                closed: false,
            }),
            dialog_tx,
        });

        let weak = Arc::downgrade(&page);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(5)).await;
                match weak.upgrade() {
                    Some(page) => {
                        if page.is_closed() {
                            break;
                        }
                        page.apply_due_and_dialogs();
                    }
                    None => break,
                }
            }
        });

        page
    }
}

/// In-memory [`BrowserSurface`] that hands out preloaded pages.
pub struct FakeBrowser {
    queued: Mutex<Vec<Arc<FakePage>>>,
    issued: Mutex<Vec<Arc<FakePage>>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self {
            queued: Mutex::new(Vec::new()),
            issued: Mutex::new(Vec::new()),
        }
    }

    /// Queue a page for the next `new_page` call.
    pub fn push_page(&self, page: Arc<FakePage>) {
        self.queued
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(page);
    }

    /// Pages handed out so far, in order.
    pub fn issued(&self) -> Vec<Arc<FakePage>> {
        self.issued
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for FakeBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserSurface for FakeBrowser {
    async fn new_page(&self) -> Result<Arc<dyn PageSurface>, SurfaceError> {
        let page = {
            let mut queued = self.queued.lock().unwrap_or_else(|e| e.into_inner());
            if queued.is_empty() {
                FakePage::builder().build()
            } else {
                queued.remove(0)
            }
        };
        self.issued
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(page.clone());
        Ok(page)
    }
}
