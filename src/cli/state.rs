// src/cli/state.rs
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::widgets::{ListState, TableState};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::cli::input::LineEdit;
use crate::cli::resources::{BudgetController, RecordId, TransactionController, WriteOutcome};
use crate::cli::session::SessionStore;
use crate::cli::util;
use crate::cli::views::{Dashboard, Insights, ViewComposer};
use crate::database::models::{
    Budget, BudgetDraft, Period, Transaction, TransactionDraft, TransactionFilter, TxnKind, BUDGET_CATEGORIES,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Login,
    Dashboard,
    Transactions,
    Budgets,
    Insights,
    Help,
}

impl Tab {
    pub const MAIN: [Tab; 5] = [Tab::Dashboard, Tab::Transactions, Tab::Budgets, Tab::Insights, Tab::Help];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Login => "Sign in",
            Tab::Dashboard => "Dashboard",
            Tab::Transactions => "Transactions",
            Tab::Budgets => "Budgets",
            Tab::Insights => "Insights",
            Tab::Help => "Help",
        }
    }

    fn step(self, delta: isize) -> Tab {
        let n = Self::MAIN.len() as isize;
        let cur = Self::MAIN.iter().position(|t| *t == self).unwrap_or(0) as isize;
        Self::MAIN[(cur + delta).rem_euclid(n) as usize]
    }
}

// ============= Login =============

#[derive(Clone, Debug)]
pub struct LoginForm {
    pub username: LineEdit,
    pub email: LineEdit,
    pub password: LineEdit,
    pub registering: bool,
    pub focus: usize,
    pub error: Option<String>,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            username: LineEdit::default(),
            email: LineEdit::default(),
            password: LineEdit::masked(),
            registering: false,
            focus: 0,
            error: None,
        }
    }
}

impl LoginForm {
    pub fn field_count(&self) -> usize {
        if self.registering { 3 } else { 2 }
    }

    /// Fields in display order.
    pub fn fields(&self) -> Vec<(&'static str, &LineEdit)> {
        let mut out = Vec::with_capacity(3);
        if self.registering {
            out.push(("Username", &self.username));
        }
        out.push(("Email", &self.email));
        out.push(("Password", &self.password));
        out
    }

    fn focused_mut(&mut self) -> &mut LineEdit {
        let idx = if self.registering { self.focus } else { self.focus + 1 };
        match idx {
            0 => &mut self.username,
            1 => &mut self.email,
            _ => &mut self.password,
        }
    }
}

// ============= Record forms =============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnField {
    Amount,
    Kind,
    Category,
    Date,
    Description,
}

impl TxnField {
    fn next(self) -> Self {
        use TxnField::*;
        match self { Amount => Kind, Kind => Category, Category => Date, Date => Description, Description => Amount }
    }
    fn prev(self) -> Self {
        use TxnField::*;
        match self { Amount => Description, Description => Date, Date => Category, Category => Kind, Kind => Amount }
    }
}

#[derive(Clone, Debug)]
pub struct TxnForm {
    pub editing_id: Option<RecordId>,
    pub amount: LineEdit,
    pub kind: TxnKind,
    pub category: String,
    pub date: LineEdit,
    pub description: LineEdit,
    pub focus: TxnField,
    pub error: Option<String>,
}

impl TxnForm {
    pub fn new() -> Self {
        let kind = TxnKind::Expense;
        Self {
            editing_id: None,
            amount: LineEdit::default(),
            kind,
            category: kind.categories()[0].to_string(),
            date: LineEdit::with(util::iso(&util::today())),
            description: LineEdit::default(),
            focus: TxnField::Amount,
            error: None,
        }
    }

    pub fn edit(t: &Transaction) -> Self {
        Self {
            editing_id: Some(t.id),
            amount: LineEdit::with(t.amount.to_string()),
            kind: t.kind,
            category: t.category.clone(),
            date: LineEdit::with(util::iso(&t.date)),
            description: LineEdit::with(t.description.clone()),
            focus: TxnField::Amount,
            error: None,
        }
    }

    fn cycle_category(&mut self, delta: isize) {
        self.category = cycle(self.kind.categories(), &self.category, delta).to_string();
    }

    fn toggle_kind(&mut self) {
        self.kind = self.kind.toggled();
        self.category = self.kind.categories()[0].to_string();
    }

    fn focused_edit(&mut self) -> Option<&mut LineEdit> {
        match self.focus {
            TxnField::Amount => Some(&mut self.amount),
            TxnField::Date => Some(&mut self.date),
            TxnField::Description => Some(&mut self.description),
            TxnField::Kind | TxnField::Category => None,
        }
    }

    pub fn draft(&self) -> Result<TransactionDraft, String> {
        let amount = util::parse_money(&self.amount.value).ok_or("Amount must be a positive number")?;
        let date = util::parse_date(&self.date.value).ok_or("Format: YYYY-MM-DD")?;
        if self.category.trim().is_empty() {
            return Err("Category is required".into());
        }
        Ok(TransactionDraft {
            amount,
            category: self.category.clone(),
            kind: self.kind,
            date,
            description: self.description.trimmed().to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetField {
    Category,
    Amount,
    Period,
    Start,
}

impl BudgetField {
    fn next(self) -> Self {
        use BudgetField::*;
        match self { Category => Amount, Amount => Period, Period => Start, Start => Category }
    }
    fn prev(self) -> Self {
        use BudgetField::*;
        match self { Category => Start, Start => Period, Period => Amount, Amount => Category }
    }
}

#[derive(Clone, Debug)]
pub struct BudgetForm {
    pub editing_id: Option<RecordId>,
    pub category: String,
    pub amount: LineEdit,
    pub period: Period,
    pub start: LineEdit,
    pub focus: BudgetField,
    pub error: Option<String>,
}

impl BudgetForm {
    pub fn new() -> Self {
        Self {
            editing_id: None,
            category: BUDGET_CATEGORIES[0].to_string(),
            amount: LineEdit::default(),
            period: Period::Monthly,
            start: LineEdit::with(util::iso(&util::today())),
            focus: BudgetField::Category,
            error: None,
        }
    }

    pub fn edit(b: &Budget) -> Self {
        Self {
            editing_id: Some(b.id),
            category: b.category.clone(),
            amount: LineEdit::with(b.amount.to_string()),
            period: b.period,
            start: LineEdit::with(util::iso(&b.start_date)),
            focus: BudgetField::Amount,
            error: None,
        }
    }

    fn focused_edit(&mut self) -> Option<&mut LineEdit> {
        match self.focus {
            BudgetField::Amount => Some(&mut self.amount),
            BudgetField::Start => Some(&mut self.start),
            BudgetField::Category | BudgetField::Period => None,
        }
    }

    pub fn draft(&self) -> Result<BudgetDraft, String> {
        let amount = util::parse_money(&self.amount.value).ok_or("Limit must be a positive number")?;
        let start_date = util::parse_date(&self.start.value).ok_or("Format: YYYY-MM-DD")?;
        Ok(BudgetDraft {
            category: self.category.clone(),
            amount,
            period: self.period,
            start_date,
        })
    }
}

fn cycle<'a>(options: &[&'a str], current: &str, delta: isize) -> &'a str {
    let n = options.len() as isize;
    match options.iter().position(|o| *o == current) {
        Some(i) => options[(i as isize + delta).rem_euclid(n) as usize],
        None => options[0],
    }
}

// ============= Pages =============

pub struct TxnPage {
    pub ctrl: TransactionController,
    pub sel: TableState,
    pub filter: TransactionFilter,
    pub search: LineEdit,
    pub searching: bool,
    pub form: Option<TxnForm>,
}

impl TxnPage {
    pub fn visible(&self) -> Vec<&Transaction> {
        self.ctrl.filtered(&self.filter)
    }

    fn selected_id(&self) -> Option<RecordId> {
        let idx = self.sel.selected()?;
        self.visible().get(idx).map(|t| t.id)
    }

    fn clamp(&mut self) {
        let n = self.visible().len();
        match (n, self.sel.selected()) {
            (0, _) => self.sel.select(None),
            (n, Some(i)) if i >= n => self.sel.select(Some(n - 1)),
            (_, None) => self.sel.select(Some(0)),
            _ => {}
        }
    }

    fn step(&mut self, delta: isize) {
        let n = self.visible().len();
        if n == 0 {
            self.sel.select(None);
            return;
        }
        let cur = self.sel.selected().unwrap_or(0) as isize;
        self.sel.select(Some((cur + delta).rem_euclid(n as isize) as usize));
    }
}

pub struct BudgetPage {
    pub ctrl: BudgetController,
    pub sel: ListState,
    pub form: Option<BudgetForm>,
}

impl BudgetPage {
    fn selected(&self) -> Option<&Budget> {
        let idx = self.sel.selected()?;
        self.ctrl.entries().get(idx).map(|e| &e.record)
    }

    fn clamp(&mut self) {
        let n = self.ctrl.len();
        match (n, self.sel.selected()) {
            (0, _) => self.sel.select(None),
            (n, Some(i)) if i >= n => self.sel.select(Some(n - 1)),
            (_, None) => self.sel.select(Some(0)),
            _ => {}
        }
    }

    fn step(&mut self, delta: isize) {
        let n = self.ctrl.len();
        if n == 0 {
            return;
        }
        let cur = self.sel.selected().unwrap_or(0) as isize;
        self.sel.select(Some((cur + delta).rem_euclid(n as isize) as usize));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmDelete {
    Transaction { id: RecordId, label: String },
    Budget { id: RecordId, label: String },
}

impl ConfirmDelete {
    pub fn prompt(&self) -> String {
        match self {
            ConfirmDelete::Transaction { label, .. } => format!("Delete transaction \"{label}\"?"),
            ConfirmDelete::Budget { label, .. } => format!("Delete the {label} budget?"),
        }
    }
}

/// Results coming back from spawned work, drained by [`App::poll_updates`].
pub enum ViewUpdate {
    Dashboard(Dashboard),
    Insights(Insights),
    /// Writes are tagged with the sign-in generation they were started under.
    Budgets(u64, WriteOutcome<Budget>),
    Transactions(u64, WriteOutcome<Transaction>),
}

pub struct App {
    pub session: Arc<SessionStore>,
    pub views: ViewComposer,
    pub tab: Tab,
    pub status: String,
    pub quit: bool,
    pub loading: bool,
    pub login: LoginForm,
    pub txn: TxnPage,
    pub budgets: BudgetPage,
    pub dashboard: Option<Dashboard>,
    pub insights: Option<Insights>,
    pub confirm: Option<ConfirmDelete>,
    view_tx: mpsc::UnboundedSender<ViewUpdate>,
    view_rx: mpsc::UnboundedReceiver<ViewUpdate>,
    view_cancel: CancellationToken,
    generation: u64,
    writes_in_flight: usize,
}

impl App {
    pub fn new(session: Arc<SessionStore>) -> Self {
        let api = session.api().clone();
        let (view_tx, view_rx) = mpsc::unbounded_channel();
        let tab = if session.is_authenticated() { Tab::Dashboard } else { Tab::Login };

        Self {
            views: ViewComposer::new(api.clone()),
            tab,
            status: "Tab: switch page | ? help | q quit".into(),
            quit: false,
            loading: false,
            login: LoginForm::default(),
            txn: TxnPage {
                ctrl: TransactionController::new(api.clone()),
                sel: TableState::default(),
                filter: TransactionFilter::default(),
                search: LineEdit::default(),
                searching: false,
                form: None,
            },
            budgets: BudgetPage {
                ctrl: BudgetController::new(api),
                sel: ListState::default(),
                form: None,
            },
            dashboard: None,
            insights: None,
            confirm: None,
            session,
            view_tx,
            view_rx,
            view_cancel: CancellationToken::new(),
            generation: 0,
            writes_in_flight: 0,
        }
    }

    pub fn writes_in_flight(&self) -> usize {
        self.writes_in_flight
    }

    /// Load whatever the starting page needs.
    pub async fn start(&mut self) {
        self.enter_tab(self.tab).await;
    }

    pub fn user_label(&self) -> String {
        match self.session.user() {
            Some(u) => format!("{} <{}>", u.username, u.email),
            None => "not signed in".into(),
        }
    }

    /// Leaving a page cancels its in-flight view loads; each page refetches
    /// on entry.
    pub async fn enter_tab(&mut self, tab: Tab) {
        self.view_cancel.cancel();
        self.view_cancel = CancellationToken::new();
        self.loading = false;
        self.tab = tab;

        match tab {
            Tab::Dashboard | Tab::Insights => self.spawn_view_load(tab),
            Tab::Transactions => self.refresh_txns().await,
            Tab::Budgets => self.refresh_budgets().await,
            Tab::Login | Tab::Help => {}
        }
    }

    fn spawn_view_load(&mut self, tab: Tab) {
        let views = self.views.clone();
        let cancel = self.view_cancel.clone();
        let tx = self.view_tx.clone();
        self.loading = true;

        tokio::spawn(async move {
            let update = match tab {
                Tab::Dashboard => views.dashboard(&cancel).await.map(ViewUpdate::Dashboard),
                Tab::Insights => views.insights(&cancel).await.map(ViewUpdate::Insights),
                _ => None,
            };
            if let Some(update) = update {
                if !cancel.is_cancelled() {
                    let _ = tx.send(update);
                }
            }
        });
    }

    // Write results are not tied to a page, so they ignore `view_cancel`.
    fn spawn_write<F, O, W>(&mut self, wrap: W, fut: F)
    where
        F: std::future::Future<Output = O> + Send + 'static,
        O: Send + 'static,
        W: FnOnce(u64, O) -> ViewUpdate + Send + 'static,
    {
        let tx = self.view_tx.clone();
        let generation = self.generation;
        self.writes_in_flight += 1;
        tokio::spawn(async move {
            let outcome = fut.await;
            let _ = tx.send(wrap(generation, outcome));
        });
    }

    /// Apply finished view loads and writes. Called once per UI tick.
    pub fn poll_updates(&mut self) {
        while let Ok(update) = self.view_rx.try_recv() {
            match update {
                ViewUpdate::Budgets(generation, outcome) => {
                    self.writes_in_flight = self.writes_in_flight.saturating_sub(1);
                    if generation == self.generation {
                        let action = outcome.action();
                        self.status = write_status("Budget", action, self.budgets.ctrl.apply(outcome));
                        self.budgets.clamp();
                    }
                }
                ViewUpdate::Transactions(generation, outcome) => {
                    self.writes_in_flight = self.writes_in_flight.saturating_sub(1);
                    if generation == self.generation {
                        let action = outcome.action();
                        self.status = write_status("Transaction", action, self.txn.ctrl.apply(outcome));
                        self.txn.clamp();
                    }
                }
                ViewUpdate::Dashboard(d) if self.tab == Tab::Dashboard => {
                    if !d.fully_live() {
                        self.status = "Some dashboard panels are showing sample data".into();
                    }
                    self.dashboard = Some(d);
                    self.loading = false;
                }
                ViewUpdate::Insights(i) if self.tab == Tab::Insights => {
                    if !i.fully_live() {
                        self.status = "Some insight panels are showing sample data".into();
                    }
                    self.insights = Some(i);
                    self.loading = false;
                }
                _ => tracing::debug!("dropping view update for a page that is no longer shown"),
            }
        }
    }

    pub async fn refresh_txns(&mut self) {
        match self.txn.ctrl.list().await {
            Ok(()) if self.txn.ctrl.source().is_sample() => {
                self.status = "Backend unreachable: showing sample transactions".into();
            }
            Ok(()) => self.status = format!("{} transactions", self.txn.ctrl.len()),
            Err(e) => self.status = format!("Load failed: {e}"),
        }
        self.txn.clamp();
    }

    pub async fn refresh_budgets(&mut self) {
        match self.budgets.ctrl.list().await {
            Ok(()) if self.budgets.ctrl.source().is_sample() => {
                self.status = "Backend unreachable: showing sample budgets".into();
            }
            Ok(()) => self.status = format!("{} budgets", self.budgets.ctrl.len()),
            Err(e) => self.status = format!("Load failed: {e}"),
        }
        self.budgets.clamp();
    }

    pub async fn logout(&mut self) {
        self.session.logout().await;
        self.view_cancel.cancel();
        self.generation += 1;
        self.txn.ctrl.clear();
        self.budgets.ctrl.clear();
        self.txn.form = None;
        self.budgets.form = None;
        self.dashboard = None;
        self.insights = None;
        self.confirm = None;
        self.login = LoginForm::default();
        self.tab = Tab::Login;
        self.status = "Signed out".into();
    }

    pub async fn handle_key(&mut self, k: KeyEvent) -> anyhow::Result<()> {
        if k.kind != KeyEventKind::Press {
            return Ok(());
        }

        if self.confirm.is_some() {
            match k.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => self.answer_delete(true),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => self.answer_delete(false),
                _ => {}
            }
            return Ok(());
        }

        if self.tab == Tab::Login {
            self.handle_login_key(k).await;
            return Ok(());
        }
        if self.tab == Tab::Transactions && self.txn.form.is_some() {
            self.handle_txn_form_key(k);
            return Ok(());
        }
        if self.tab == Tab::Budgets && self.budgets.form.is_some() {
            self.handle_budget_form_key(k);
            return Ok(());
        }
        if self.tab == Tab::Transactions && self.txn.searching {
            self.handle_search_key(k);
            return Ok(());
        }

        match k.code {
            KeyCode::Char('q') => {
                self.quit = true;
                return Ok(());
            }
            KeyCode::Tab => {
                self.enter_tab(self.tab.step(1)).await;
                return Ok(());
            }
            KeyCode::BackTab => {
                self.enter_tab(self.tab.step(-1)).await;
                return Ok(());
            }
            KeyCode::Char('?') => {
                self.enter_tab(Tab::Help).await;
                return Ok(());
            }
            KeyCode::Char('L') => {
                self.logout().await;
                return Ok(());
            }
            KeyCode::Char('r') => {
                self.enter_tab(self.tab).await;
                return Ok(());
            }
            _ => {}
        }

        match self.tab {
            Tab::Transactions => match k.code {
                KeyCode::Up => self.txn.step(-1),
                KeyCode::Down => self.txn.step(1),
                KeyCode::Char('n') => self.txn.form = Some(TxnForm::new()),
                KeyCode::Char('e') | KeyCode::Enter => {
                    if let Some(t) = self.txn.selected_id().and_then(|id| self.txn.ctrl.get(id)) {
                        self.txn.form = Some(TxnForm::edit(t));
                    }
                }
                KeyCode::Char('x') | KeyCode::Delete => {
                    if let Some(t) = self.txn.selected_id().and_then(|id| self.txn.ctrl.get(id)) {
                        let label = if t.description.is_empty() { t.category.clone() } else { t.description.clone() };
                        self.confirm = Some(ConfirmDelete::Transaction { id: t.id, label });
                    }
                }
                KeyCode::Char('f') => {
                    self.txn.filter.kind = self.txn.filter.kind.next();
                    self.txn.clamp();
                }
                KeyCode::Char('/') => self.txn.searching = true,
                _ => {}
            },
            Tab::Budgets => match k.code {
                KeyCode::Up => self.budgets.step(-1),
                KeyCode::Down => self.budgets.step(1),
                KeyCode::Char('n') => self.budgets.form = Some(BudgetForm::new()),
                KeyCode::Char('e') | KeyCode::Enter => {
                    if let Some(form) = self.budgets.selected().map(BudgetForm::edit) {
                        self.budgets.form = Some(form);
                    }
                }
                KeyCode::Char('x') | KeyCode::Delete => {
                    if let Some(b) = self.budgets.selected() {
                        self.confirm = Some(ConfirmDelete::Budget { id: b.id, label: b.category.clone() });
                    }
                }
                _ => {}
            },
            Tab::Help => {
                if k.code == KeyCode::Esc {
                    self.enter_tab(Tab::Dashboard).await;
                }
            }
            Tab::Dashboard | Tab::Insights | Tab::Login => {}
        }
        Ok(())
    }

    async fn handle_login_key(&mut self, k: KeyEvent) {
        let form = &mut self.login;
        match k.code {
            KeyCode::Esc => self.quit = true,
            KeyCode::Char('r') if k.modifiers.contains(KeyModifiers::CONTROL) => {
                form.registering = !form.registering;
                form.focus = 0;
                form.error = None;
            }
            KeyCode::Tab | KeyCode::Down => form.focus = (form.focus + 1) % form.field_count(),
            KeyCode::BackTab | KeyCode::Up => {
                form.focus = (form.focus + form.field_count() - 1) % form.field_count();
            }
            KeyCode::Left => form.focused_mut().left(),
            KeyCode::Right => form.focused_mut().right(),
            KeyCode::Backspace => form.focused_mut().backspace(),
            KeyCode::Delete => form.focused_mut().delete(),
            KeyCode::Char(c) => form.focused_mut().push(c),
            KeyCode::Enter => self.submit_login().await,
            _ => {}
        }
    }

    async fn submit_login(&mut self) {
        let email = self.login.email.trimmed().to_string();
        let password = self.login.password.value.clone();
        let username = self.login.username.trimmed().to_string();

        if email.is_empty() || password.is_empty() || (self.login.registering && username.is_empty()) {
            self.login.error = Some("All fields are required".into());
            return;
        }

        let result = if self.login.registering {
            self.session.register(&username, &email, &password).await
        } else {
            self.session.login(&email, &password).await
        };

        match result {
            Ok(session) => {
                self.login = LoginForm::default();
                self.status = format!("Signed in as {}", session.user.username);
                self.enter_tab(Tab::Dashboard).await;
            }
            Err(e) => {
                self.login.password.clear();
                self.login.error = Some(e.to_string());
            }
        }
    }

    fn handle_search_key(&mut self, k: KeyEvent) {
        match k.code {
            KeyCode::Enter | KeyCode::Esc => self.txn.searching = false,
            KeyCode::Backspace => self.txn.search.backspace(),
            KeyCode::Left => self.txn.search.left(),
            KeyCode::Right => self.txn.search.right(),
            KeyCode::Char(c) => self.txn.search.push(c),
            _ => {}
        }
        self.txn.filter.search = self.txn.search.value.clone();
        self.txn.clamp();
    }

    fn handle_txn_form_key(&mut self, k: KeyEvent) {
        let Some(form) = self.txn.form.as_mut() else { return };
        match k.code {
            KeyCode::Esc => self.txn.form = None,
            KeyCode::Enter => self.submit_txn_form(),
            KeyCode::Tab | KeyCode::Down => form.focus = form.focus.next(),
            KeyCode::BackTab | KeyCode::Up => form.focus = form.focus.prev(),
            KeyCode::Left | KeyCode::Right if form.focus == TxnField::Kind => form.toggle_kind(),
            KeyCode::Left if form.focus == TxnField::Category => form.cycle_category(-1),
            KeyCode::Right if form.focus == TxnField::Category => form.cycle_category(1),
            KeyCode::Char(' ') if form.focus == TxnField::Kind => form.toggle_kind(),
            KeyCode::Left => {
                if let Some(edit) = form.focused_edit() {
                    edit.left();
                }
            }
            KeyCode::Right => {
                if let Some(edit) = form.focused_edit() {
                    edit.right();
                }
            }
            KeyCode::Backspace => {
                if let Some(edit) = form.focused_edit() {
                    edit.backspace();
                }
            }
            KeyCode::Char(c) => {
                if let Some(edit) = form.focused_edit() {
                    edit.push(c);
                }
            }
            _ => {}
        }
    }

    /// Stages the row (for a create) and hands the request to a spawned task,
    /// so the pending row is drawn while the backend answers.
    fn submit_txn_form(&mut self) {
        let Some(form) = self.txn.form.as_mut() else { return };
        let draft = match form.draft() {
            Ok(d) => d,
            Err(msg) => {
                form.error = Some(msg);
                return;
            }
        };
        let editing = form.editing_id;
        let api = self.txn.ctrl.api().clone();

        match editing {
            Some(id) => self.spawn_write(ViewUpdate::Transactions, TransactionController::send_update(api, id, draft)),
            None => {
                let pending = self.txn.ctrl.stage_create(draft);
                self.spawn_write(ViewUpdate::Transactions, TransactionController::send_create(api, pending));
            }
        }
        self.txn.form = None;
        self.status = "Saving transaction...".into();
        self.txn.clamp();
    }

    fn handle_budget_form_key(&mut self, k: KeyEvent) {
        let Some(form) = self.budgets.form.as_mut() else { return };
        match k.code {
            KeyCode::Esc => self.budgets.form = None,
            KeyCode::Enter => self.submit_budget_form(),
            KeyCode::Tab | KeyCode::Down => form.focus = form.focus.next(),
            KeyCode::BackTab | KeyCode::Up => form.focus = form.focus.prev(),
            KeyCode::Left if form.focus == BudgetField::Category => {
                form.category = cycle(&BUDGET_CATEGORIES, &form.category, -1).to_string();
            }
            KeyCode::Right if form.focus == BudgetField::Category => {
                form.category = cycle(&BUDGET_CATEGORIES, &form.category, 1).to_string();
            }
            KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') if form.focus == BudgetField::Period => {
                form.period = form.period.toggled();
            }
            KeyCode::Left => {
                if let Some(edit) = form.focused_edit() {
                    edit.left();
                }
            }
            KeyCode::Right => {
                if let Some(edit) = form.focused_edit() {
                    edit.right();
                }
            }
            KeyCode::Backspace => {
                if let Some(edit) = form.focused_edit() {
                    edit.backspace();
                }
            }
            KeyCode::Char(c) => {
                if let Some(edit) = form.focused_edit() {
                    edit.push(c);
                }
            }
            _ => {}
        }
    }

    fn submit_budget_form(&mut self) {
        let Some(form) = self.budgets.form.as_mut() else { return };
        let draft = match form.draft() {
            Ok(d) => d,
            Err(msg) => {
                form.error = Some(msg);
                return;
            }
        };
        let editing = form.editing_id;
        let api = self.budgets.ctrl.api().clone();

        match editing {
            Some(id) => self.spawn_write(ViewUpdate::Budgets, BudgetController::send_update(api, id, draft)),
            None => {
                let pending = self.budgets.ctrl.stage_create(draft);
                self.spawn_write(ViewUpdate::Budgets, BudgetController::send_create(api, pending));
            }
        }
        self.budgets.form = None;
        self.status = "Saving budget...".into();
        self.budgets.clamp();
    }

    /// A declined prompt never reaches the network. A confirmed delete keeps
    /// the row until the backend agrees.
    fn answer_delete(&mut self, confirmed: bool) {
        let Some(pending) = self.confirm.take() else { return };
        if !confirmed {
            self.status = "Delete cancelled.".into();
            return;
        }
        match pending {
            ConfirmDelete::Transaction { id, .. } => {
                let api = self.txn.ctrl.api().clone();
                self.spawn_write(ViewUpdate::Transactions, TransactionController::send_delete(api, id));
            }
            ConfirmDelete::Budget { id, .. } => {
                let api = self.budgets.ctrl.api().clone();
                self.spawn_write(ViewUpdate::Budgets, BudgetController::send_delete(api, id));
            }
        }
        self.status = "Deleting...".into();
    }
}

fn write_status(noun: &str, action: &str, result: crate::error::AppResult<()>) -> String {
    match result {
        Ok(()) => format!("{noun} {action}"),
        Err(e) => format!("{noun} not {action}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::api::Client;
    use crate::cli::fallback::{self, DataSource};
    use crate::cli::resources::SyncState;
    use crate::cli::session::MemorySessionStorage;
    use crate::cli::views::Panel;
    use crate::database::models::{Session, User};
    use std::time::Duration;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn offline_app() -> App {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        app_at(format!("http://127.0.0.1:{port}")).await
    }

    // Accepts connections and never answers.
    async fn silent_backend() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((sock, _)) = listener.accept().await {
                held.push(sock);
            }
        });
        format!("http://{addr}")
    }

    async fn app_at(base_url: String) -> App {
        let api = Client::new(base_url, Duration::from_millis(500)).unwrap();
        let storage = MemorySessionStorage::with(Session {
            token: "t".into(),
            user: User { id: 1, email: "sam@example.com".into(), username: "sam".into() },
        });
        let session = SessionStore::restore(api, Arc::new(storage)).await.unwrap();
        App::new(Arc::new(session))
    }

    #[tokio::test]
    async fn persisted_session_starts_on_dashboard() {
        let app = offline_app().await;
        assert_eq!(app.tab, Tab::Dashboard);
        assert_eq!(app.user_label(), "sam <sam@example.com>");
    }

    #[tokio::test]
    async fn declining_the_delete_prompt_keeps_the_row() {
        let mut app = offline_app().await;
        app.enter_tab(Tab::Transactions).await;
        let before = app.txn.ctrl.len();
        assert!(before > 0);

        app.handle_key(press(KeyCode::Char('x'))).await.unwrap();
        assert!(app.confirm.is_some());
        app.handle_key(press(KeyCode::Char('n'))).await.unwrap();

        assert!(app.confirm.is_none());
        assert_eq!(app.txn.ctrl.len(), before);
        assert_eq!(app.status, "Delete cancelled.");
    }

    #[tokio::test]
    async fn filter_key_cycles_and_narrows_the_table() {
        let mut app = offline_app().await;
        app.enter_tab(Tab::Transactions).await;
        app.handle_key(press(KeyCode::Char('f'))).await.unwrap();
        assert!(app.txn.visible().iter().all(|t| t.kind == TxnKind::Income));

        app.handle_key(press(KeyCode::Char('/'))).await.unwrap();
        for c in "web".chars() {
            app.handle_key(press(KeyCode::Char(c))).await.unwrap();
        }
        app.handle_key(press(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.txn.visible().len(), 1);
        assert!(!app.txn.searching);
    }

    #[tokio::test]
    async fn invalid_form_input_is_reported_without_a_request() {
        let mut app = offline_app().await;
        app.enter_tab(Tab::Budgets).await;
        app.handle_key(press(KeyCode::Char('n'))).await.unwrap();
        app.handle_key(press(KeyCode::Enter)).await.unwrap();
        let form = app.budgets.form.as_ref().unwrap();
        assert_eq!(form.error.as_deref(), Some("Limit must be a positive number"));
    }

    #[tokio::test]
    async fn logout_returns_to_login() {
        let mut app = offline_app().await;
        app.enter_tab(Tab::Budgets).await;
        app.handle_key(press(KeyCode::Char('L'))).await.unwrap();
        assert_eq!(app.tab, Tab::Login);
        assert!(!app.session.is_authenticated());
        assert!(app.budgets.ctrl.is_empty());
    }

    #[tokio::test]
    async fn new_budget_is_drawn_pending_while_the_backend_is_silent() {
        let mut app = app_at(silent_backend().await).await;
        app.tab = Tab::Budgets;
        app.handle_key(press(KeyCode::Char('n'))).await.unwrap();
        app.handle_key(press(KeyCode::Tab)).await.unwrap();
        for c in "250".chars() {
            app.handle_key(press(KeyCode::Char(c))).await.unwrap();
        }

        tokio::time::timeout(Duration::from_millis(200), app.handle_key(press(KeyCode::Enter)))
            .await
            .expect("Enter should return before the backend answers")
            .unwrap();

        assert!(app.budgets.form.is_none());
        assert_eq!(app.budgets.ctrl.len(), 1);
        assert_eq!(app.budgets.ctrl.entries()[0].state, SyncState::Pending);
        assert_eq!(app.budgets.ctrl.entries()[0].record.amount, rust_decimal::Decimal::from(250));
        assert_eq!(app.writes_in_flight(), 1);

        app.poll_updates();
        assert_eq!(app.budgets.ctrl.entries()[0].state, SyncState::Pending);

        // The client gives up after 500ms and the row is rolled back.
        tokio::time::sleep(Duration::from_millis(1000)).await;
        app.poll_updates();
        assert!(app.budgets.ctrl.is_empty());
        assert_eq!(app.writes_in_flight(), 0);
        assert!(app.status.starts_with("Budget not created"), "status: {}", app.status);
    }

    #[tokio::test]
    async fn confirmed_delete_is_settled_on_a_later_tick() {
        let mut app = offline_app().await;
        app.enter_tab(Tab::Transactions).await;
        let before = app.txn.ctrl.len();

        app.handle_key(press(KeyCode::Char('x'))).await.unwrap();
        app.handle_key(press(KeyCode::Char('y'))).await.unwrap();
        assert_eq!(app.status, "Deleting...");
        assert_eq!(app.txn.ctrl.len(), before);

        tokio::time::sleep(Duration::from_millis(700)).await;
        app.poll_updates();
        assert_eq!(app.txn.ctrl.len(), before);
        assert!(app.status.starts_with("Transaction not deleted"), "status: {}", app.status);
    }

    #[tokio::test]
    async fn leaving_the_dashboard_discards_its_load() {
        let mut app = offline_app().await;
        app.enter_tab(Tab::Dashboard).await;
        app.enter_tab(Tab::Transactions).await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        app.poll_updates();
        assert!(app.dashboard.is_none());
        assert!(!app.loading);

        // A result that slips through after the switch is still dropped.
        let stale = Dashboard {
            stats: Panel { data: fallback::dashboard_stats(), source: DataSource::Sample },
            recent: Panel { data: fallback::recent_transactions(), source: DataSource::Sample },
            categories: Panel { data: fallback::category_breakdown(), source: DataSource::Sample },
            trend: Panel { data: fallback::monthly_trend(), source: DataSource::Sample },
        };
        app.view_tx.send(ViewUpdate::Dashboard(stale)).unwrap();
        app.poll_updates();
        assert!(app.dashboard.is_none());
    }

    #[tokio::test]
    async fn writes_started_before_logout_are_ignored() {
        let mut app = offline_app().await;
        app.enter_tab(Tab::Budgets).await;
        let stale_generation = app.generation;
        app.handle_key(press(KeyCode::Char('L'))).await.unwrap();

        let outcome = WriteOutcome::Updated { id: 1, result: Ok(fallback::budgets()) };
        app.view_tx.send(ViewUpdate::Budgets(stale_generation, outcome)).unwrap();
        app.poll_updates();
        assert!(app.budgets.ctrl.is_empty());
        assert_eq!(app.status, "Signed out");
    }

    #[test]
    fn cycling_options_wraps() {
        assert_eq!(cycle(&BUDGET_CATEGORIES, "Other", 1), "Groceries");
        assert_eq!(cycle(&BUDGET_CATEGORIES, "Groceries", -1), "Other");
        assert_eq!(cycle(&BUDGET_CATEGORIES, "Unknown", 1), "Groceries");
    }
}
