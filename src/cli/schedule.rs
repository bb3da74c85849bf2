//! The interactive calendar: `rigcal schedule`.
//!
//! Reads one command per line. Changes written by other sessions are picked
//! up before each command runs.

use std::io::{self, BufRead, Write};

use jiff::civil::Date;

use crate::{
    calendar::ViewMode,
    config::Config,
    dates::{DateError, YearMonth, parse_due_date},
    model::Role,
    role::resolve_role,
    session::{self, Confirm, DropTarget, Gesture, Outcome, Prompt, SchedulerSession},
    storage::Storage,
};

use super::{Scope, format, load_scope};

const HELP: &str = "Commands:
  show               redraw the current month
  next, prev         change month
  month YYYY-MM      jump to a month
  move FROM TO       propose moving the group due FROM to TO
  park FROM          take the group due FROM off the calendar
  click FROM         accept, withdraw, or reset the move of FROM's group
  reset FROM         remove the move of FROM's group
  details DATE       devices due on DATE
  help               this text
  quit               leave";

pub(super) fn cmd_schedule(
    storage: &Storage,
    config: &Config,
    scope: &Scope,
    role: Option<Role>,
    month: YearMonth,
) -> Result<(), String> {
    let loaded = load_scope(storage, scope)?;
    let role = match loaded.mode {
        ViewMode::Interactive => resolve_role(role, config)?,
        // Read-only: the role only matters for labels.
        ViewMode::Aggregate => resolve_role(role, config).unwrap_or(Role::Authority),
    };

    let mut session = SchedulerSession::open(
        storage,
        loaded.partner_id,
        loaded.devices,
        role,
        loaded.mode,
        month,
    )
    .map_err(|e| format!("failed to open calendar: {e}"))?;

    let result = run_loop(&mut session, &mut io::stdin().lock(), &mut io::stdout().lock())
        .map_err(|e| format!("terminal error: {e}"));
    session.close();
    result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Show,
    Next,
    Prev,
    Month(YearMonth),
    Move { origin: Date, target: Date },
    Park(Date),
    Click(Date),
    Reset(Date),
    Details(Date),
    Help,
    Quit,
}

/// Parses one input line. Blank lines yield `None`.
fn parse_input(line: &str) -> Result<Option<Input>, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&command, args)) = words.split_first() else {
        return Ok(None);
    };
    let date = |i: usize| -> Result<Date, String> {
        let raw = args
            .get(i)
            .ok_or_else(|| format!("`{command}` needs a date; try `help`"))?;
        parse_due_date(raw).map_err(|e| e.to_string())
    };

    let input = match command.to_ascii_lowercase().as_str() {
        "show" | "s" => Input::Show,
        "next" | "n" => Input::Next,
        "prev" | "p" => Input::Prev,
        "month" | "m" => {
            let raw = args.first().ok_or("`month` needs YYYY-MM")?;
            Input::Month(raw.parse().map_err(|e: DateError| e.to_string())?)
        }
        "move" => Input::Move {
            origin: date(0)?,
            target: date(1)?,
        },
        "park" => Input::Park(date(0)?),
        "click" => Input::Click(date(0)?),
        "reset" => Input::Reset(date(0)?),
        "details" | "d" => Input::Details(date(0)?),
        "help" | "?" => Input::Help,
        "quit" | "q" | "exit" => Input::Quit,
        other => return Err(format!("unknown command `{other}`; try `help`")),
    };
    Ok(Some(input))
}

fn run_loop<R: BufRead, W: Write>(
    session: &mut SchedulerSession<'_>,
    input: &mut R,
    out: &mut W,
) -> io::Result<()> {
    if session.mode().is_interactive() {
        writeln!(out, "Acting as {}. Type `help` for commands.", session.role())?;
    } else {
        writeln!(out, "All partners, read-only. Type `help` for commands.")?;
    }
    show(session, out)?;

    let mut line = String::new();
    loop {
        write!(out, "> ")?;
        out.flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }

        let changed = session.pump();
        if changed > 0 {
            writeln!(out, "({changed} device(s) changed elsewhere)")?;
        }

        let command = match parse_input(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                writeln!(out, "{e}")?;
                continue;
            }
        };

        match command {
            Input::Quit => break,
            Input::Help => writeln!(out, "{HELP}")?,
            Input::Show => show(session, out)?,
            Input::Next => {
                session.next_month();
                show(session, out)?;
            }
            Input::Prev => {
                session.prev_month();
                show(session, out)?;
            }
            Input::Month(month) => {
                session.show_month(month);
                show(session, out)?;
            }
            Input::Details(date) => details(session, date, out)?,
            Input::Move { origin, target } => {
                let gesture = Gesture::Drop {
                    origin,
                    onto: DropTarget::Day(target),
                };
                apply(session, input, out, |s, c| s.handle(gesture, c))?;
            }
            Input::Park(origin) => {
                let gesture = Gesture::Drop {
                    origin,
                    onto: DropTarget::ParkingTray,
                };
                apply(session, input, out, |s, c| s.handle(gesture, c))?;
            }
            Input::Click(origin) => {
                let gesture = if session.has_move(origin) {
                    Gesture::ClickProposal { origin }
                } else {
                    Gesture::ClickOriginal { date: origin }
                };
                apply(session, input, out, |s, c| s.handle(gesture, c))?;
            }
            Input::Reset(origin) => apply(session, input, out, |s, c| s.reset(origin, c))?,
        }
    }
    Ok(())
}

/// Runs a gesture, asking any confirmation on the same terminal, and reports
/// what happened.
fn apply<'s, R, W, F>(
    session: &mut SchedulerSession<'s>,
    input: &mut R,
    out: &mut W,
    action: F,
) -> io::Result<()>
where
    R: BufRead,
    W: Write,
    F: FnOnce(&mut SchedulerSession<'s>, &mut dyn Confirm) -> session::Result<Outcome>,
{
    let result = {
        let mut confirm = |prompt: &Prompt| ask(&mut *input, &mut *out, prompt);
        action(session, &mut confirm)
    };

    match result {
        Ok(outcome) => {
            writeln!(out, "{}", format::outcome(&outcome))?;
            if changes_calendar(&outcome) {
                show(session, out)?;
            }
        }
        Err(e) => writeln!(out, "Not saved: {e}. Run the command again to retry.")?,
    }
    Ok(())
}

/// Asks a yes/no question. Anything but an explicit yes, including a read
/// error, is a no.
fn ask<R: BufRead, W: Write>(input: &mut R, out: &mut W, prompt: &Prompt) -> bool {
    if write!(out, "{}", format::prompt(prompt))
        .and_then(|()| out.flush())
        .is_err()
    {
        return false;
    }
    let mut answer = String::new();
    match input.read_line(&mut answer) {
        Ok(n) if n > 0 => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        _ => false,
    }
}

fn changes_calendar(outcome: &Outcome) -> bool {
    matches!(
        outcome,
        Outcome::Proposed(_)
            | Outcome::Parked { .. }
            | Outcome::Withdrawn(_)
            | Outcome::Accepted(_)
            | Outcome::Reset(_)
    )
}

fn show<W: Write>(session: &SchedulerSession<'_>, out: &mut W) -> io::Result<()> {
    let grid = session.view();
    writeln!(out, "{}", format::month_grid(&grid))?;
    if session.mode().is_interactive() {
        writeln!(out, "{}", format::parking(&session.parking_tray()))?;
    }
    writeln!(out, "{}", format::agenda(&grid))
}

fn details<W: Write>(
    session: &mut SchedulerSession<'_>,
    date: Date,
    out: &mut W,
) -> io::Result<()> {
    let mut decline = |_: &Prompt| false;
    if let Ok(Outcome::Breakdown { date, partners }) =
        session.handle(Gesture::ClickDay { date }, &mut decline)
    {
        writeln!(out, "{}", format::breakdown(date, &partners))?;
    }

    if let Some(day) = session.view().day(date) {
        for badge in &day.badges {
            writeln!(out, "{date}  {}", format::badge_text(badge))?;
        }
    }

    let devices = session.details(date);
    if devices.is_empty() {
        return writeln!(out, "No devices due on {date}");
    }
    for device in devices {
        writeln!(out, "  {}", format::device_line(device))?;
    }
    Ok(())
}
