//! Printing the conversation transcript.

use std::io::Write;

use clap::Args;

use crate::config::HistoryConfig;
use crate::history::{ConversationTurn, Transcript};

#[derive(Args, Debug, Clone)]
pub struct HistoryCommand {
    /// Show only the most recent N turns
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// Print the transcript to stdout.
pub fn run_history_command(cmd: HistoryCommand, config: &HistoryConfig) -> anyhow::Result<()> {
    let Some(path) = &config.transcript_path else {
        println!("Transcript is disabled (QUERYBOT_TRANSCRIPT_DISABLED is set).");
        return Ok(());
    };

    let turns = Transcript::new(path).read_all()?;
    if turns.is_empty() {
        println!("No conversation history at {}", path.display());
        return Ok(());
    }

    let mut stdout = std::io::stdout().lock();
    write_turns(&mut stdout, &turns, cmd.limit)?;
    Ok(())
}

fn write_turns(
    out: &mut impl Write,
    turns: &[ConversationTurn],
    limit: Option<usize>,
) -> std::io::Result<()> {
    let skip = limit.map_or(0, |n| turns.len().saturating_sub(n));
    for turn in &turns[skip..] {
        writeln!(
            out,
            "{} [{}] {}",
            turn.created_at.format("%Y-%m-%d %H:%M:%S"),
            turn.sender,
            turn.content
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Sender;

    fn turns() -> Vec<ConversationTurn> {
        vec![
            ConversationTurn::new(Sender::Human, "How many tracks are there?"),
            ConversationTurn::new(Sender::Ai, "There are 3503 tracks."),
            ConversationTurn::new(Sender::Human, "And albums?"),
        ]
    }

    #[test]
    fn test_write_turns_respects_limit() {
        let mut out = Vec::new();
        write_turns(&mut out, &turns(), Some(2)).unwrap();
        let text = String::from_utf8(out).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[AI] There are 3503 tracks."));
        assert!(lines[1].ends_with("[Human] And albums?"));
    }

    #[test]
    fn test_write_turns_without_limit() {
        let mut out = Vec::new();
        write_turns(&mut out, &turns(), None).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 3);
    }
}
