//! Interview CLI commands: start, answer, end, list, show, questions.

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use mockloop_types::interview::{
    InterviewStatus, StartInterviewRequest, TranscriptItem, TurnInput, TurnOutcome,
};

use crate::state::AppState;

fn spinner(message: &'static str, json: bool) -> ProgressBar {
    if json {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Start an interview and print its first question.
///
/// # Examples
///
/// ```bash
/// mockloop start --user 1 --position "Backend Engineer" --name "Mock #1" \
///     --resume-file resume.txt
/// ```
pub async fn start_interview(
    state: &AppState,
    request: StartInterviewRequest,
    json: bool,
) -> Result<()> {
    let spinner = spinner("Preparing the first question...", json);
    let result = state.interview_service.start_interview(request).await;
    spinner.finish_and_clear();
    let started = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&started)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Interview {} started",
        style("✓").green().bold(),
        style(started.interview_id).cyan().bold()
    );
    print_outcome(started.interview_id, &started.first_question);
    Ok(())
}

/// Submit one turn and print the next question.
pub async fn answer(state: &AppState, id: i64, input: TurnInput, json: bool) -> Result<()> {
    let spinner = spinner("Interviewer is thinking...", json);
    let result = state.interview_service.submit_turn(id, input).await;
    spinner.finish_and_clear();
    let outcome = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    if !outcome.evaluation.is_empty() {
        println!();
        println!("  {}  {}", style("Evaluation:").bold(), outcome.evaluation);
    }
    print_outcome(id, &outcome);
    Ok(())
}

fn print_outcome(id: i64, outcome: &TurnOutcome) {
    println!();
    match &outcome.next_question {
        Some(question) => {
            let label = if outcome.need_followup { "Follow-up:" } else { "Question:" };
            println!("  {}  {}", style(label).bold(), style(question).cyan());
            if let Some(qid) = outcome.interview_question_id {
                println!("  {}", style(format!("question id {qid}")).dim());
            }
        }
        None => println!("  {} No more questions.", style("i").blue().bold()),
    }
    println!(
        "  {}  {}  {}",
        style("Progress:").bold(),
        outcome.progress,
        style(format!("({})", outcome.current_stage)).dim()
    );
    if outcome.need_end {
        println!();
        println!(
            "  Wrap up with: {}",
            style(format!("mockloop end {id}")).yellow()
        );
    }
    println!();
}

/// Score and end an interview.
pub async fn end_interview(state: &AppState, id: i64, json: bool) -> Result<()> {
    let spinner = spinner("Scoring the interview...", json);
    let result = state.interview_service.end_interview(id).await;
    spinner.finish_and_clear();
    let assessment = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Interview {} ended",
        style("✓").green().bold(),
        style(id).cyan().bold()
    );
    println!();
    println!(
        "  {}  {}",
        style("Score:").bold(),
        score_style(assessment.final_score)
    );
    println!("  {}  {}", style("Feedback:").bold(), assessment.feedback);
    println!();
    Ok(())
}

fn score_style(score: i32) -> console::StyledObject<String> {
    let text = format!("{score}/100");
    match score {
        80.. => style(text).green().bold(),
        60..=79 => style(text).yellow().bold(),
        _ => style(text).red().bold(),
    }
}

/// List a user's interviews in a table, newest first.
pub async fn list_interviews(state: &AppState, user_id: i64, json: bool) -> Result<()> {
    let interviews = state.interview_service.list_interviews(user_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&interviews)?);
        return Ok(());
    }

    if interviews.is_empty() {
        println!();
        println!(
            "  {} No interviews found. Start one with: {}",
            style("i").blue().bold(),
            style("mockloop start").yellow()
        );
        println!();
        return Ok(());
    }

    let cached = state.interview_service.cached_sessions(user_id).await;

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Position").fg(Color::White),
        Cell::new("Started").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Cached").fg(Color::White),
    ]);

    for interview in &interviews {
        let status_cell = match interview.ended_at {
            Some(ended) => Cell::new(format!("○ ended {}", format_time(&ended))).fg(Color::DarkGrey),
            None => Cell::new("● open").fg(Color::Green),
        };
        let cached_cell = if cached.contains(&interview.id) {
            Cell::new("yes").fg(Color::Cyan)
        } else {
            Cell::new("-").fg(Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(interview.id).fg(Color::Cyan),
            Cell::new(&interview.position),
            Cell::new(format_time(&interview.started_at)).fg(Color::DarkGrey),
            status_cell,
            cached_cell,
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} interview{}",
        style(interviews.len()).bold(),
        if interviews.len() == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}

/// Show the summary of one interview.
pub async fn show_interview(state: &AppState, id: i64, json: bool) -> Result<()> {
    let summary = state.interview_service.get_interview(id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let interview = &summary.interview;
    println!();
    println!(
        "  {} {}",
        style(&interview.name).cyan().bold(),
        style(format!("#{}", interview.id)).dim()
    );
    println!();
    println!("  {}  {}", style("Position:").bold(), interview.position);
    println!("  {}  {}", style("Provider:").bold(), interview.provider);
    println!("  {}  {}", style("Status:").bold(), format_status(summary.status));
    println!("  {}  {}", style("Progress:").bold(), summary.progress);
    println!(
        "  {}  {}",
        style("Started:").bold(),
        format_time(&interview.started_at)
    );
    if let Some(ended) = &interview.ended_at {
        println!("  {}  {}", style("Ended:").bold(), format_time(ended));
    }
    if let (Some(score), Some(feedback)) = (interview.final_score, &interview.feedback) {
        println!("  {}  {}", style("Score:").bold(), score_style(score));
        println!("  {}  {}", style("Feedback:").bold(), feedback);
    }
    println!();
    Ok(())
}

fn format_status(status: InterviewStatus) -> console::StyledObject<String> {
    match status {
        InterviewStatus::Created => style("◌ created".to_string()).yellow(),
        InterviewStatus::Active => style("● active".to_string()).green(),
        InterviewStatus::Ended => style("○ ended".to_string()).dim(),
    }
}

/// Print the transcript of an interview.
pub async fn show_questions(state: &AppState, id: i64, json: bool) -> Result<()> {
    let transcript = state.interview_service.get_interview_questions(id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&transcript.items())?);
        return Ok(());
    }

    println!();
    for item in transcript.items() {
        match item {
            TranscriptItem::Entry(entry) => {
                println!(
                    "  {} {}  {}",
                    style(format!("{:>2}.", entry.order)).bold(),
                    style(&entry.question_text).cyan(),
                    style(format!("[{}]", entry.stage)).dim()
                );
                match &entry.answer_text {
                    Some(answer) => println!("      {}", answer),
                    None => println!("      {}", style("(unanswered)").dim()),
                }
                if !entry.evaluation.is_empty() {
                    println!("      {}", style(&entry.evaluation).italic());
                }
                println!();
            }
            TranscriptItem::Summary(summary) => match (summary.final_score, &summary.feedback) {
                (Some(score), Some(feedback)) => {
                    println!("  {}  {}", style("Score:").bold(), score_style(score));
                    println!("  {}  {}", style("Feedback:").bold(), feedback);
                    println!();
                }
                _ => {
                    println!(
                        "  {} Not scored yet. End it with: {}",
                        style("i").blue().bold(),
                        style(format!("mockloop end {}", summary.interview_id)).yellow()
                    );
                    println!();
                }
            },
        }
    }
    Ok(())
}

fn format_time(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_bands() {
        assert!(score_style(92).to_string().contains("92/100"));
        assert!(score_style(75).to_string().contains("75/100"));
        assert!(score_style(10).to_string().contains("10/100"));
    }

    #[test]
    fn test_format_time() {
        let dt = DateTime::parse_from_rfc3339("2026-03-01T09:05:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_time(&dt), "2026-03-01 09:05");
    }
}
