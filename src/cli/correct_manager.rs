use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{LineGauge, Paragraph},
    Frame,
};

use crate::catalog::Catalog;
use crate::error::Result;
use crate::fmt::money;
use crate::models::{MismatchKind, ProjectStatus};
use crate::recon::{GroupSummary, Session};
use crate::tui::{FOOTER_STYLE, HEADER_STYLE};

/// Interactive pass over the correctable mismatch groups of one session.
/// One decision per group: assign a catalog entry, ignore, or skip for now.
struct GroupCorrector<'a> {
    groups: Vec<GroupSummary>,
    current: usize,
    query: String,
    selection: usize,
    catalog: &'a Catalog,
    project_labels: Vec<(i64, String)>,
    employee_labels: Vec<(i64, String)>,
}

impl<'a> GroupCorrector<'a> {
    fn new(session: &Session, catalog: &'a Catalog) -> Self {
        let groups: Vec<GroupSummary> = session
            .groups()
            .into_iter()
            .filter(|g| g.kind.is_correctable() && g.decision.is_none())
            .collect();

        // Finished projects are not valid correction targets
        let project_labels = catalog
            .projects()
            .iter()
            .filter(|p| p.status != ProjectStatus::Finished)
            .map(|p| (p.id, format!("{} · {} · {}", p.sae_code, p.internal_code, p.name)))
            .collect();
        let employee_labels = catalog
            .employees()
            .iter()
            .filter(|e| e.active)
            .map(|e| (e.id, format!("{} · {} · {}/h", e.emp_code, e.name, money(e.hourly_rate))))
            .collect();

        Self {
            groups,
            current: 0,
            query: String::new(),
            selection: 0,
            catalog,
            project_labels,
            employee_labels,
        }
    }

    fn is_done(&self) -> bool {
        self.current >= self.groups.len()
    }

    fn group(&self) -> &GroupSummary {
        &self.groups[self.current]
    }

    fn choices(&self) -> &[(i64, String)] {
        match self.group().kind {
            MismatchKind::UnresolvedEmployee => &self.employee_labels,
            _ => &self.project_labels,
        }
    }

    fn filtered(&self) -> Vec<(i64, &str)> {
        if self.query.is_empty() {
            return vec![];
        }
        let q = self.query.to_lowercase();
        self.choices()
            .iter()
            .filter(|(_, label)| label.to_lowercase().contains(&q))
            .map(|(id, label)| (*id, label.as_str()))
            .take(9)
            .collect()
    }

    fn advance(&mut self) {
        self.current += 1;
        self.query.clear();
        self.selection = 0;
    }

    fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let group = self.group();
        let total = self.groups.len();

        let [header_area, progress_area, detail_area, picker_area, hints_area] =
            Layout::vertical([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(6),
                Constraint::Fill(1),
                Constraint::Length(1),
            ])
            .areas(area);

        frame.render_widget(
            Paragraph::new(format!(" Reconciling {total} unresolved group(s)"))
                .style(HEADER_STYLE),
            header_area,
        );

        let ratio = if total > 1 {
            self.current as f64 / (total - 1) as f64
        } else {
            1.0
        };
        let gauge = LineGauge::default()
            .label(format!("{} of {}", self.current + 1, total))
            .ratio(ratio)
            .filled_style(Style::default().fg(Color::Green).bold())
            .unfilled_style(Style::default().fg(Color::DarkGray))
            .line_set(ratatui::symbols::line::THICK);
        frame.render_widget(gauge, progress_area);

        let target = match group.kind {
            MismatchKind::UnresolvedEmployee => "an employee",
            _ => "a project",
        };
        let detail_lines = vec![
            Line::from(""),
            Line::from(format!("  Kind:   {}", group.kind.label())),
            Line::from(vec![
                Span::raw("  Value:  "),
                Span::styled(group.raw_value.clone(), Style::default().bold()),
            ]),
            Line::from(format!("  Rows:   {}", group.rows)),
            Line::from(format!("  Assign {target} or ignore the whole group.")),
            Line::from(""),
        ];
        frame.render_widget(Paragraph::new(detail_lines), detail_area);

        let matches = self.filtered();
        let mut picker_lines = vec![Line::from(format!("  Filter: {}\u{2588}", self.query))];
        if !self.query.is_empty() && matches.is_empty() {
            picker_lines.push(Line::from(Span::styled(
                "    (no matches)",
                Style::default().fg(Color::DarkGray),
            )));
        } else {
            for (i, (_, label)) in matches.iter().enumerate() {
                let marker = if i == self.selection { ">" } else { " " };
                picker_lines.push(Line::from(format!("  {marker} {label}")));
            }
        }
        frame.render_widget(Paragraph::new(picker_lines), picker_area);

        frame.render_widget(
            Paragraph::new("Type to filter, Enter=assign, Tab=ignore group, Esc=skip, Ctrl+C=quit")
                .style(FOOTER_STYLE),
            hints_area,
        );
    }
}

pub fn run(session: &mut Session, catalog: &Catalog) -> Result<()> {
    let mut corrector = GroupCorrector::new(session, catalog);
    if corrector.is_done() {
        return Ok(());
    }

    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        ratatui::restore();
        hook(info);
    }));

    let mut terminal = ratatui::init();

    let result: Result<()> = loop {
        if let Err(e) = terminal.draw(|frame| corrector.draw(frame)) {
            break Err(e.into());
        }

        match event::read() {
            Err(e) => break Err(e.into()),
            Ok(Event::Key(key)) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if key.modifiers.contains(KeyModifiers::CONTROL)
                    && key.code == KeyCode::Char('c')
                {
                    break Ok(());
                }
                match key.code {
                    KeyCode::Char(c) => {
                        corrector.query.push(c);
                        corrector.selection = 0;
                    }
                    KeyCode::Backspace => {
                        corrector.query.pop();
                        corrector.selection = 0;
                    }
                    KeyCode::Up => {
                        corrector.selection = corrector.selection.saturating_sub(1);
                    }
                    KeyCode::Down => {
                        let matches = corrector.filtered();
                        if !matches.is_empty() {
                            corrector.selection =
                                (corrector.selection + 1).min(matches.len() - 1);
                        }
                    }
                    KeyCode::Enter => {
                        let matches = corrector.filtered();
                        if !matches.is_empty() {
                            let sel = corrector.selection.min(matches.len() - 1);
                            let id = matches[sel].0;
                            let group = corrector.group().clone();
                            if let Err(e) = session.set_correction(
                                group.kind,
                                &group.raw_value,
                                id,
                                corrector.catalog,
                            ) {
                                break Err(e);
                            }
                            corrector.advance();
                        }
                    }
                    KeyCode::Tab => {
                        let group = corrector.group().clone();
                        session.set_ignore(group.kind, &group.raw_value);
                        corrector.advance();
                    }
                    KeyCode::Esc => {
                        corrector.advance();
                    }
                    _ => {}
                }
                if corrector.is_done() {
                    break Ok(());
                }
            }
            _ => {}
        }
    };

    drop(terminal);
    ratatui::restore();

    if result.is_ok() {
        let remaining = session.unresolved();
        if remaining == 0 {
            println!("All mismatch groups resolved.");
        } else {
            println!("{remaining} group(s) left undecided.");
        }
    }
    result
}
