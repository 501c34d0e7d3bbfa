use annotation_core::{AnnotationError, AnnotationSession, AnnotationStore, RecordStore};
use anyhow::Result;
use shared::domain::{AnnotatorId, EventTypeId};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "commands: 1/2/3 pick prediction, t IDX toggle token, T IDX extend range, \
n not-in-list, e ID pick type, > next, < previous, g N go to item, s save, \
/ QUERY quick search, ? QUERY full search, q save and quit, q! quit without saving";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReviewCommand {
    Prediction(usize),
    Toggle { index: usize, extend: bool },
    NotInList,
    EventType(EventTypeId),
    Next,
    Previous,
    Goto(usize),
    Save,
    QuickSearch(String),
    FullSearch(String),
    Help,
    Quit,
    Discard,
}

pub(crate) fn parse_command(line: &str) -> Option<ReviewCommand> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    let command = match head {
        "1" | "2" | "3" => ReviewCommand::Prediction(head.parse::<usize>().ok()? - 1),
        "t" => ReviewCommand::Toggle {
            index: rest.parse().ok()?,
            extend: false,
        },
        "T" => ReviewCommand::Toggle {
            index: rest.parse().ok()?,
            extend: true,
        },
        "n" | "N" => ReviewCommand::NotInList,
        "e" if !rest.is_empty() => ReviewCommand::EventType(EventTypeId::from(rest)),
        ">" | "" => ReviewCommand::Next,
        "<" => ReviewCommand::Previous,
        "g" => ReviewCommand::Goto(rest.parse::<usize>().ok()?.checked_sub(1)?),
        "s" => ReviewCommand::Save,
        "/" => ReviewCommand::QuickSearch(rest.to_string()),
        "?" => ReviewCommand::FullSearch(rest.to_string()),
        "h" | "help" => ReviewCommand::Help,
        "q" | "quit" => ReviewCommand::Quit,
        "q!" => ReviewCommand::Discard,
        _ => return None,
    };
    Some(command)
}

pub(crate) async fn run<S: AnnotationStore>(store: RecordStore<S>, annotator: AnnotatorId) -> Result<()> {
    let mut session = match AnnotationSession::open(store, annotator).await {
        Ok(session) => session,
        Err(AnnotationError::EmptyView(_)) => {
            println!("annotator {annotator} has nothing to review");
            return Ok(());
        }
        Err(error) => return Err(error.into()),
    };

    println!("{HELP}");
    render(&session);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(command) = parse_command(&line) else {
            println!("unrecognised input; type h for help");
            continue;
        };
        match command {
            ReviewCommand::Quit => match save_before_quit(&mut session).await {
                Ok(()) => break,
                Err(AnnotationError::Storage(error)) => {
                    println!("save failed, not quitting: {error:#}; retry q, or q! to discard");
                    continue;
                }
                Err(error) => return Err(error.into()),
            },
            ReviewCommand::Discard => break,
            _ => {}
        }
        match apply(&mut session, command).await {
            Ok(()) => render(&session),
            Err(AnnotationError::Storage(error)) => {
                println!("save failed, item kept on screen: {error:#}");
            }
            Err(error) => println!("{error}"),
        }
    }
    let progress = session.progress();
    println!(
        "done for now: {}/{} ({}%)",
        progress.completed, progress.total, progress.percentage
    );
    Ok(())
}

/// Persists pending edits before leaving. A failed save leaves the session
/// untouched so the caller can stay on the item.
pub(crate) async fn save_before_quit<S: AnnotationStore>(
    session: &mut AnnotationSession<S>,
) -> annotation_core::Result<()> {
    if session.has_unsaved_changes() {
        session.save().await?;
    }
    Ok(())
}

async fn apply<S: AnnotationStore>(
    session: &mut AnnotationSession<S>,
    command: ReviewCommand,
) -> annotation_core::Result<()> {
    match command {
        ReviewCommand::Prediction(rank) => {
            if !session.select_prediction(rank)? {
                println!("no prediction #{}", rank + 1);
            }
        }
        ReviewCommand::Toggle { index, extend } => session.toggle_token(index, extend)?,
        ReviewCommand::NotInList => session.toggle_not_in_list(),
        ReviewCommand::EventType(id) => session.select_event_type(&id)?,
        ReviewCommand::Next => {
            if !session.next().await? {
                session.save().await?;
                println!("last item reached");
            }
        }
        ReviewCommand::Previous => {
            session.previous().await?;
        }
        ReviewCommand::Goto(index) => {
            if !session.navigate(index).await? {
                println!("no item #{}", index + 1);
            }
        }
        ReviewCommand::Save => {
            session.save().await?;
            println!("saved");
        }
        ReviewCommand::QuickSearch(query) => print_matches(session.catalog().search_inline(&query)),
        ReviewCommand::FullSearch(query) => print_matches(session.catalog().search_all(&query)),
        ReviewCommand::Help => println!("{HELP}"),
        ReviewCommand::Quit | ReviewCommand::Discard => {}
    }
    Ok(())
}

fn print_matches(matches: Vec<&shared::domain::EventType>) {
    if matches.is_empty() {
        println!("no matching event types");
    }
    for event_type in matches {
        println!("  {:<20} {}  {}", event_type.id, event_type.name, event_type.description);
    }
}

fn render<S: AnnotationStore>(session: &AnnotationSession<S>) {
    let entry = session.current();
    let selection = session.selection();
    let progress = session.progress();

    println!();
    println!(
        "[{}/{}] item {}  ({}% done){}",
        session.current_index() + 1,
        session.len(),
        entry.item.id,
        progress.percentage,
        if entry.is_annotated() { "  [saved]" } else { "" }
    );
    println!("  {}", entry.item.sentence);
    let tokens: Vec<String> = entry
        .item
        .tokens
        .iter()
        .enumerate()
        .map(|(index, token)| {
            if selection.selected_trigger_indices.contains(&index) {
                format!("{index}:[{token}]")
            } else {
                format!("{index}:{token}")
            }
        })
        .collect();
    println!("  {}", tokens.join(" "));

    for (rank, id) in entry.item.model_prediction.top_event_types.iter().enumerate() {
        let name = session
            .catalog()
            .get(id)
            .map(|event_type| event_type.name.as_str())
            .unwrap_or("?");
        let marker = if selection.selected_event_type.as_ref() == Some(id) {
            "*"
        } else {
            " "
        };
        println!("  {marker}{}) {name}", rank + 1);
    }
    match (&selection.selected_event_type, selection.not_in_list) {
        (_, true) => println!("  event type: not in list"),
        (Some(id), false) => println!("  event type: {id}"),
        (None, false) => println!("  event type: (none)"),
    }
}

#[cfg(test)]
#[path = "tests/review_tests.rs"]
mod tests;
