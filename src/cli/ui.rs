use rust_decimal::{prelude::ToPrimitive, Decimal};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Gauge, List, ListItem, Paragraph, Row, Table, Tabs, Wrap},
    Frame,
};

use crate::cli::fallback::DataSource;
use crate::cli::resources::SyncState;
use crate::cli::state::{App, BudgetField, BudgetForm, Tab, TxnField, TxnForm};
use crate::cli::util::{fmt_money, fmt_percent, fmt_signed, iso, today};
use crate::database::models::{category_shares, BudgetStatus, Impact, InsightKind, TxnKind};

pub fn draw(f: &mut Frame, app: &mut App) {
    let size = f.size();

    // tabs | page | status line
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(10), Constraint::Length(1)])
        .split(size);

    draw_tabs(f, root[0], app);

    match app.tab {
        Tab::Login => draw_login(f, root[1], app),
        Tab::Dashboard => draw_dashboard(f, root[1], app),
        Tab::Transactions => draw_txns(f, root[1], app),
        Tab::Budgets => draw_budgets(f, root[1], app),
        Tab::Insights => draw_insights(f, root[1], app),
        Tab::Help => draw_help(f, root[1]),
    }

    let mut spans = vec![
        Span::styled(format!(" {} ", app.user_label()), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" "),
    ];
    if app.writes_in_flight() > 0 {
        spans.push(Span::styled(
            format!("[{} syncing] ", app.writes_in_flight()),
            Style::default().fg(Color::Yellow),
        ));
    }
    spans.push(Span::raw(app.status.clone()));
    let status = Paragraph::new(Line::from(spans));
    f.render_widget(status, root[2]);

    if app.tab == Tab::Transactions {
        if let Some(form) = &app.txn.form {
            let area = center_rect(root[1], 60, 12);
            f.render_widget(Clear, area);
            draw_txn_form(f, area, form);
        }
    }
    if app.tab == Tab::Budgets {
        if let Some(form) = &app.budgets.form {
            let area = center_rect(root[1], 60, 11);
            f.render_widget(Clear, area);
            draw_budget_form(f, area, form);
        }
    }
    if let Some(confirm) = &app.confirm {
        let area = center_rect(root[1], 50, 5);
        f.render_widget(Clear, area);
        let p = Paragraph::new(format!("{}\n\ny: delete   n/Esc: keep", confirm.prompt()))
            .block(Block::default().borders(Borders::ALL).title("Confirm"))
            .wrap(Wrap { trim: true });
        f.render_widget(p, area);
    }
}

fn draw_tabs(f: &mut Frame, area: Rect, app: &App) {
    let tabs: Vec<Tab> = if app.tab == Tab::Login { vec![Tab::Login] } else { Tab::MAIN.to_vec() };
    let titles = tabs.iter().map(|t| Line::from(t.title())).collect::<Vec<_>>();
    let selected = tabs.iter().position(|t| *t == app.tab).unwrap_or(0);
    let widget = Tabs::new(titles)
        .select(selected)
        .block(Block::default().borders(Borders::ALL).title("Finance Dashboard"))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD));
    f.render_widget(widget, area);
}

fn titled(title: &str, source: DataSource) -> String {
    match source {
        DataSource::Live => title.to_string(),
        DataSource::Sample => format!("{title} (sample)"),
    }
}

// Login Page

fn draw_login(f: &mut Frame, area: Rect, app: &mut App) {
    let form = &app.login;
    let mut lines: Vec<Line> = Vec::new();
    for (i, (label, edit)) in form.fields().into_iter().enumerate() {
        let marker = if i == form.focus { "> " } else { "  " };
        lines.push(Line::from(format!("{marker}{label:<9}: {}", edit.rendered())));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(if form.registering {
        "Enter: create account | Ctrl+r: back to sign in | Esc: quit"
    } else {
        "Enter: sign in | Ctrl+r: create an account | Esc: quit"
    }));
    if let Some(err) = &form.error {
        lines.push(Line::from(Span::styled(err.clone(), Style::default().fg(Color::Red))));
    }

    let title = if form.registering { "Create account" } else { "Sign in" };
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(Clear, center_rect(area, 64, 9));
    f.render_widget(p, center_rect(area, 64, 9));
}

// Dashboard Page

fn draw_dashboard(f: &mut Frame, area: Rect, app: &mut App) {
    let Some(dash) = &app.dashboard else {
        let msg = if app.loading { "Loading dashboard…" } else { "No data" };
        f.render_widget(Paragraph::new(msg).block(Block::default().borders(Borders::ALL)), area);
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(8), Constraint::Length(10)])
        .split(area);

    let s = &dash.stats.data;
    let stats = Paragraph::new(vec![
        Line::from(format!(
            "Income {}   Expenses {}   Balance {}",
            fmt_money(&s.total_income),
            fmt_money(&s.total_expenses),
            fmt_money(&s.balance)
        )),
        Line::from(format!(
            "Monthly change {:+.1}%   Transactions {}   Budget utilization {:.0}%",
            s.monthly_change, s.transaction_count, s.budget_utilization
        )),
    ])
    .block(Block::default().borders(Borders::ALL).title(titled("Overview", dash.stats.source)));
    f.render_widget(stats, rows[0]);

    let mid = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[1]);

    let recent: Vec<Row> = dash
        .recent
        .data
        .iter()
        .map(|t| {
            Row::new(vec![
                Cell::from(iso(&t.date)),
                Cell::from(t.description.clone()),
                Cell::from(t.category.clone()),
                Cell::from(fmt_signed(t)),
            ])
        })
        .collect();
    let table = Table::new(
        recent,
        [Constraint::Length(11), Constraint::Percentage(45), Constraint::Length(15), Constraint::Length(12)],
    )
    .header(Row::new(vec!["Date", "Description", "Category", "Amount"]))
    .block(Block::default().borders(Borders::ALL).title(titled("Recent transactions", dash.recent.source)));
    f.render_widget(table, mid[0]);

    let slices: Vec<ListItem> = category_shares(&dash.categories.data)
        .into_iter()
        .zip(dash.categories.data.iter())
        .map(|((name, share), slice)| {
            ListItem::new(format!("{name:<15} {:>10}  {}", fmt_money(&slice.value), fmt_percent(&share)))
        })
        .collect();
    f.render_widget(
        List::new(slices).block(
            Block::default()
                .borders(Borders::ALL)
                .title(titled("Spending by category", dash.categories.source)),
        ),
        mid[1],
    );

    let trend: Vec<Row> = dash
        .trend
        .data
        .iter()
        .map(|p| {
            Row::new(vec![
                Cell::from(p.month.clone()),
                Cell::from(fmt_money(&p.income)),
                Cell::from(fmt_money(&p.expenses)),
                Cell::from(fmt_money(&p.income.saturating_sub(p.expenses))),
            ])
        })
        .collect();
    let trend = Table::new(
        trend,
        [Constraint::Length(8), Constraint::Length(14), Constraint::Length(14), Constraint::Length(14)],
    )
    .header(Row::new(vec!["Month", "Income", "Expenses", "Net"]))
    .block(Block::default().borders(Borders::ALL).title(titled("Monthly trend", dash.trend.source)));
    f.render_widget(trend, rows[2]);
}

// Transactions Page

fn draw_txns(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5)])
        .split(area);

    let search_hint = if app.txn.searching { "  <typing, Enter to finish>" } else { "" };
    let filter = Paragraph::new(format!(
        "Type: {} (f)   Search: {}{} (/)",
        app.txn.filter.kind.label(),
        app.txn.search.rendered(),
        search_hint
    ))
    .block(Block::default().borders(Borders::ALL).title("Filter"));
    f.render_widget(filter, rows[0]);

    let pending: Vec<i64> = app
        .txn
        .ctrl
        .entries()
        .iter()
        .filter(|e| e.state == SyncState::Pending)
        .map(|e| e.record.id)
        .collect();

    let body: Vec<Row> = app
        .txn
        .visible()
        .into_iter()
        .map(|t| {
            let desc = if pending.contains(&t.id) { format!("{} (saving…)", t.description) } else { t.description.clone() };
            let style = match t.kind {
                TxnKind::Income => Style::default().fg(Color::Green),
                TxnKind::Expense => Style::default(),
            };
            Row::new(vec![
                Cell::from(iso(&t.date)),
                Cell::from(desc),
                Cell::from(t.category.clone()),
                Cell::from(t.kind.as_str()),
                Cell::from(fmt_signed(t)).style(style),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(11),
        Constraint::Percentage(40),
        Constraint::Length(15),
        Constraint::Length(8),
        Constraint::Length(14),
    ];

    let title = titled(
        "Transactions (Up/Down, n=new, e=edit, x=delete, r=refresh)",
        app.txn.ctrl.source(),
    );
    let mut sel = app.txn.sel.clone();
    let table = Table::new(body, widths)
        .header(Row::new(vec!["Date", "Description", "Category", "Type", "Amount"]).height(1))
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    f.render_stateful_widget(table, rows[1], &mut sel);
    app.txn.sel = sel;
}

fn draw_txn_form(f: &mut Frame, area: Rect, form: &TxnForm) {
    let mark = |field: TxnField| if form.focus == field { "> " } else { "  " };
    let mut lines = vec![
        format!("{}Amount     : {}", mark(TxnField::Amount), form.amount.rendered()),
        format!("{}Type       : {}  (←/→)", mark(TxnField::Kind), form.kind.as_str()),
        format!("{}Category   : {}  (←/→)", mark(TxnField::Category), form.category),
        format!("{}Date       : {}", mark(TxnField::Date), form.date.rendered()),
        format!("{}Description: {}", mark(TxnField::Description), form.description.rendered()),
        String::new(),
        "Tab: next field | Enter: save | Esc: cancel".into(),
    ];
    if let Some(err) = &form.error {
        lines.push(err.clone());
    }
    let title = if form.editing_id.is_some() { "Edit Transaction" } else { "Add Transaction" };
    let p = Paragraph::new(lines.join("\n")).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

// Budgets Page

fn status_style(status: BudgetStatus) -> Style {
    match status {
        BudgetStatus::Normal => Style::default().fg(Color::Green),
        BudgetStatus::Warning => Style::default().fg(Color::Yellow),
        BudgetStatus::OverBudget => Style::default().fg(Color::Red),
    }
}

fn draw_budgets(f: &mut Frame, area: Rect, app: &mut App) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let items: Vec<ListItem> = app
        .budgets
        .ctrl
        .entries()
        .iter()
        .map(|e| {
            let b = &e.record;
            let saving = if e.state == SyncState::Pending { " (saving…)" } else { "" };
            ListItem::new(Line::from(vec![
                Span::raw(format!("{:<15} {:<8}", b.category, b.period.as_str())),
                Span::styled(
                    format!("{} / {}  {} used", fmt_money(&b.spent), fmt_money(&b.amount), fmt_percent(&b.percent_used())),
                    status_style(b.status()),
                ),
                Span::raw(saving),
            ]))
        })
        .collect();

    let title = titled("Budgets (Up/Down, n=new, e=edit, x=delete, r=refresh)", app.budgets.ctrl.source());
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, cols[0], &mut app.budgets.sel);

    let selected = app
        .budgets
        .sel
        .selected()
        .and_then(|i| app.budgets.ctrl.entries().get(i))
        .map(|e| &e.record);

    let detail_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(4)])
        .split(cols[1]);

    match selected {
        Some(b) => {
            let gauge = Gauge::default()
                .block(Block::default().borders(Borders::ALL).title("Progress"))
                .gauge_style(status_style(b.status()))
                .percent(b.bar_percent());
            f.render_widget(gauge, detail_rows[0]);

            let mut lines = vec![
                format!("Category : {}", b.category),
                format!("Period   : {} ({} → {})", b.period.as_str(), iso(&b.start_date), iso(&b.end_date)),
                format!("Limit    : {}", fmt_money(&b.amount)),
                format!("Spent    : {}", fmt_money(&b.spent)),
                format!("Left     : {}", fmt_money(&b.remaining())),
            ];
            if let Some(over) = b.overspend() {
                lines.push(format!("Over budget by {}", fmt_money(&over)));
            }
            let p = Paragraph::new(lines.join("\n")).block(Block::default().borders(Borders::ALL).title("Details"));
            f.render_widget(p, detail_rows[1]);
        }
        None => {
            let p = Paragraph::new("No budgets yet. Press n to add one.")
                .block(Block::default().borders(Borders::ALL).title("Details"));
            f.render_widget(p, cols[1]);
        }
    }
}

fn draw_budget_form(f: &mut Frame, area: Rect, form: &BudgetForm) {
    let mark = |field: BudgetField| if form.focus == field { "> " } else { "  " };
    let mut lines = vec![
        format!("{}Category : {}  (←/→)", mark(BudgetField::Category), form.category),
        format!("{}Limit    : {}", mark(BudgetField::Amount), form.amount.rendered()),
        format!("{}Period   : {}  (←/→)", mark(BudgetField::Period), form.period.as_str()),
        format!("{}Start    : {}", mark(BudgetField::Start), form.start.rendered()),
        String::new(),
        "Tab: next field | Enter: save | Esc: cancel".into(),
    ];
    if let Some(err) = &form.error {
        lines.push(err.clone());
    }
    let title = if form.editing_id.is_some() { "Edit Budget" } else { "Add Budget" };
    let p = Paragraph::new(lines.join("\n")).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

// Insights Page

fn draw_insights(f: &mut Frame, area: Rect, app: &mut App) {
    let Some(page) = &app.insights else {
        let msg = if app.loading { "Loading insights…" } else { "No data" };
        f.render_widget(Paragraph::new(msg).block(Block::default().borders(Borders::ALL)), area);
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(2), Constraint::Min(8)])
        .split(area);

    let goal = &page.goal;
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Savings goal"))
        .gauge_style(Style::default().fg(Color::Cyan))
        .label(format!(
            "{} of {} ({} complete)",
            fmt_money(&goal.current),
            fmt_money(&goal.target),
            fmt_percent(&goal.progress_percent())
        ))
        .percent(goal.progress_percent().min(Decimal::ONE_HUNDRED).to_u16().unwrap_or(0));
    f.render_widget(gauge, rows[0]);

    let projection = match (goal.months_to_goal(), goal.projected_completion(today())) {
        (Some(0), _) => "Goal reached.".to_string(),
        (Some(months), Some(date)) => format!(
            "At {}/month you reach the goal in {months} months (by {}).",
            fmt_money(&goal.monthly_rate),
            date.format("%B %Y")
        ),
        _ => "Set a monthly savings rate to project a completion date.".to_string(),
    };
    f.render_widget(Paragraph::new(projection), rows[1]);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(25), Constraint::Percentage(25)])
        .split(rows[2]);

    let insights: Vec<ListItem> = page
        .insights
        .data
        .iter()
        .map(|i| {
            let tag = match i.kind {
                InsightKind::Warning => "!",
                InsightKind::Tip => "*",
                InsightKind::Prediction => "~",
            };
            let style = match i.impact {
                Impact::High => Style::default().fg(Color::Red),
                Impact::Medium => Style::default().fg(Color::Yellow),
                Impact::Low => Style::default().fg(Color::Green),
            };
            ListItem::new(vec![
                Line::from(Span::styled(format!("{tag} {} ({:?} impact)", i.title, i.impact), style)),
                Line::from(format!("  {}", i.description)),
            ])
        })
        .collect();
    f.render_widget(
        List::new(insights).block(Block::default().borders(Borders::ALL).title(titled("Insights", page.insights.source))),
        cols[0],
    );

    let predictions: Vec<Row> = page
        .predictions
        .data
        .iter()
        .map(|p| {
            Row::new(vec![
                Cell::from(p.category.clone()),
                Cell::from(fmt_money(&p.predicted)),
                Cell::from(format!("{}%", p.confidence_percent())),
            ])
        })
        .collect();
    f.render_widget(
        Table::new(predictions, [Constraint::Percentage(45), Constraint::Percentage(30), Constraint::Percentage(25)])
            .header(Row::new(vec!["Category", "Next month", "Conf."]))
            .block(Block::default().borders(Borders::ALL).title(titled("Predictions", page.predictions.source))),
        cols[1],
    );

    let pattern: Vec<Row> = page
        .pattern
        .data
        .iter()
        .map(|p| Row::new(vec![Cell::from(p.day.clone()), Cell::from(fmt_money(&p.amount))]))
        .collect();
    f.render_widget(
        Table::new(pattern, [Constraint::Length(5), Constraint::Min(8)])
            .header(Row::new(vec!["Day", "Avg spend"]))
            .block(Block::default().borders(Borders::ALL).title(titled("Weekly pattern", page.pattern.source))),
        cols[2],
    );
}

fn draw_help(f: &mut Frame, area: Rect) {
    let help_text = [
        "Global Keys:",
        "  q          : Quit",
        "  Tab/S-Tab  : Next / previous page",
        "  r          : Reload current page",
        "  ?          : This help",
        "  L          : Sign out",
        "",
        "Transactions:",
        "  Up/Down    : Navigate",
        "  n / e      : New / edit selected",
        "  x / Del    : Delete selected (asks first)",
        "  f          : Cycle type filter (all, income, expense)",
        "  /          : Search description and category",
        "",
        "Budgets:",
        "  Up/Down    : Navigate",
        "  n / e      : New / edit selected",
        "  x / Del    : Delete selected (asks first)",
        "",
        "Forms:",
        "  Tab        : Next field",
        "  Left/Right : Change type, category or period",
        "  Enter      : Save",
        "  Esc        : Cancel",
    ]
    .join("\n");

    let p = Paragraph::new(help_text).block(Block::default().borders(Borders::ALL).title("Help & Keybindings"));
    f.render_widget(p, area);
}

fn center_rect(rect: Rect, w: u16, h: u16) -> Rect {
    let x = rect.x + rect.width.saturating_sub(w) / 2;
    let y = rect.y + rect.height.saturating_sub(h) / 2;
    Rect { x, y, width: w.min(rect.width), height: h.min(rect.height) }
}
