//! Weekly statistics handler.

use tabled::{Table, Tabled, settings::Style};

use mbsi_core::{Portal, WeeklyStatistics};

use crate::cli::{GlobalOpts, OutputFormat, StatsArgs};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct RankRow {
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Rank")]
    rank: String,
}

pub async fn handle(portal: &Portal, args: StatsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let account = super::require_session(portal).await?;
    let student_id = args.student.unwrap_or(account.id);

    let stats = portal.weekly_statistics(&student_id).await?;

    let rendered = match global.output {
        OutputFormat::Table => render_stats_table(&stats),
        OutputFormat::Plain => {
            let simple = stats.simple_stats.unwrap_or_default();
            let school_rank = stats
                .rankings
                .as_ref()
                .and_then(|r| r.school_rank)
                .map_or_else(|| "-".into(), |r| r.to_string());
            format!("{} {school_rank}", simple.total_sum)
        }
        ref format => output::render_single(format, &stats, |_| String::new(), |_| String::new()),
    };
    output::print_output(&rendered, global.quiet);
    Ok(())
}

/// `"2 of 28"`, degrading gracefully when either number is missing.
fn fmt_rank(rank: Option<i64>, total: Option<i64>) -> String {
    match (rank, total) {
        (Some(rank), Some(total)) => format!("{rank} of {total}"),
        (Some(rank), None) => rank.to_string(),
        _ => "-".into(),
    }
}

fn render_stats_table(stats: &WeeklyStatistics) -> String {
    let simple = stats.simple_stats.unwrap_or_default();
    let average = if simple.total_grades > 0 {
        #[allow(clippy::cast_precision_loss)]
        let avg = simple.total_sum as f64 / simple.total_grades as f64;
        format!("{avg:.1}")
    } else {
        "-".into()
    };

    let school_rank = stats.rankings.as_ref().map_or_else(
        || "-".into(),
        |r| fmt_rank(r.school_rank, r.school_total_students),
    );
    let summary = output::kv_lines(&[
        ("Grades this week", simple.total_grades.to_string()),
        ("Total points", simple.total_sum.to_string()),
        ("Average", average),
        ("School rank", school_rank),
    ]);

    let class_ranks = stats
        .rankings
        .as_ref()
        .map(|r| r.class_ranks.as_slice())
        .unwrap_or_default();
    if class_ranks.is_empty() {
        return summary;
    }

    let rows: Vec<RankRow> = class_ranks
        .iter()
        .map(|r| RankRow {
            class: r
                .class
                .as_ref()
                .and_then(|c| c.name.clone())
                .unwrap_or_else(|| "-".into()),
            rank: fmt_rank(r.rank, r.total_students),
        })
        .collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    format!("{summary}\n\n{table}")
}
