//! Chart payloads in the shape the dashboard's chart widgets consume.

use crate::taxonomy::{category_bar_color, Taxonomy};
use crate::timeline::DailySentiment;
use serde::{Deserialize, Serialize};

const POSITIVE_COLOR: &str = "#4ade80";
const NEUTRAL_COLOR: &str = "#fde047";
const NEGATIVE_COLOR: &str = "#f87171";
const LINE_TENSION: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarDataset {
    pub label: String,
    pub data: Vec<u64>,
    pub background_color: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<BarDataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDataset {
    pub label: String,
    pub data: Vec<f64>,
    pub border_color: String,
    pub background_color: String,
    pub tension: f64,
    pub fill: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<LineDataset>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineChartMode {
    /// Mean score per day.
    #[default]
    Overall,
    /// Stacked positive/neutral/negative percentages per day.
    Breakdown,
}

fn bar_color(key: &str, taxonomy: &Taxonomy) -> &'static str {
    match key {
        "sentiment_positive" => POSITIVE_COLOR,
        "sentiment_neutral" => NEUTRAL_COLOR,
        "sentiment_negative" => NEGATIVE_COLOR,
        _ => category_bar_color(taxonomy.category_of(key)),
    }
}

/// Single "Count" dataset over `(tally key, count)` pairs, in input order.
pub fn bar_chart_data(entries: &[(String, u64)], taxonomy: &Taxonomy) -> BarChartData {
    BarChartData {
        labels: entries
            .iter()
            .map(|(key, _)| taxonomy.display_name(key))
            .collect(),
        datasets: vec![BarDataset {
            label: "Count".to_string(),
            data: entries.iter().map(|(_, count)| *count).collect(),
            background_color: entries
                .iter()
                .map(|(key, _)| bar_color(key, taxonomy).to_string())
                .collect(),
        }],
    }
}

fn line_dataset(
    label: &str,
    data: Vec<f64>,
    border_color: &str,
    background_color: &str,
    fill: bool,
) -> LineDataset {
    LineDataset {
        label: label.to_string(),
        data,
        border_color: border_color.to_string(),
        background_color: background_color.to_string(),
        tension: LINE_TENSION,
        fill,
    }
}

pub fn line_chart_data(series: &[DailySentiment], mode: LineChartMode) -> LineChartData {
    let labels = series.iter().map(|day| day.date.clone()).collect();
    let column = |pick: fn(&DailySentiment) -> f64| series.iter().map(pick).collect::<Vec<_>>();

    let datasets = match mode {
        LineChartMode::Overall => vec![line_dataset(
            "Overall Sentiment",
            column(|day| day.overall),
            "rgb(75, 192, 192)",
            "rgba(75, 192, 192, 0.5)",
            false,
        )],
        LineChartMode::Breakdown => vec![
            line_dataset(
                "Positive",
                column(|day| f64::from(day.positive)),
                POSITIVE_COLOR,
                "rgba(74, 222, 128, 0.5)",
                true,
            ),
            line_dataset(
                "Neutral",
                column(|day| f64::from(day.neutral)),
                NEUTRAL_COLOR,
                "rgba(253, 224, 71, 0.5)",
                true,
            ),
            line_dataset(
                "Negative",
                column(|day| f64::from(day.negative)),
                NEGATIVE_COLOR,
                "rgba(248, 113, 113, 0.5)",
                true,
            ),
        ],
    };

    LineChartData { labels, datasets }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(date: &str, positive: u32, neutral: u32, negative: u32, overall: f64) -> DailySentiment {
        DailySentiment {
            date: date.to_string(),
            positive,
            neutral,
            negative,
            overall,
        }
    }

    #[test]
    fn test_bar_chart_colors_and_labels() {
        let taxonomy = Taxonomy::builtin();
        let entries = vec![
            ("sentiment_neutral".to_string(), 5),
            ("water".to_string(), 4),
            ("floods".to_string(), 3),
            ("xyz_unmapped".to_string(), 1),
        ];
        let chart = bar_chart_data(&entries, &taxonomy);
        assert_eq!(chart.labels, vec!["Neutral", "Water", "Floods", "xyz unmapped"]);
        assert_eq!(chart.datasets.len(), 1);
        assert_eq!(chart.datasets[0].label, "Count");
        assert_eq!(chart.datasets[0].data, vec![5, 4, 3, 1]);
        assert_eq!(
            chart.datasets[0].background_color,
            vec![
                "#fde047",
                "rgba(6, 182, 212, 0.7)",
                "rgba(129, 140, 248, 0.7)",
                "rgba(192, 132, 252, 0.7)",
            ]
        );
    }

    #[test]
    fn test_line_chart_modes() {
        let series = vec![day("2025-04-19", 50, 0, 50, 45.0), day("2025-04-20", 100, 0, 0, 80.0)];

        let overall = line_chart_data(&series, LineChartMode::Overall);
        assert_eq!(overall.labels, vec!["2025-04-19", "2025-04-20"]);
        assert_eq!(overall.datasets.len(), 1);
        assert_eq!(overall.datasets[0].data, vec![45.0, 80.0]);
        assert!(!overall.datasets[0].fill);

        let breakdown = line_chart_data(&series, LineChartMode::Breakdown);
        let labels: Vec<_> = breakdown.datasets.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["Positive", "Neutral", "Negative"]);
        assert_eq!(breakdown.datasets[2].data, vec![50.0, 0.0]);
        assert!(breakdown.datasets.iter().all(|d| d.fill));
    }

    #[test]
    fn test_chart_wire_shape() {
        let chart = line_chart_data(&[day("2025-04-19", 100, 0, 0, 70.0)], LineChartMode::Overall);
        let value = serde_json::to_value(&chart).unwrap();
        assert_eq!(
            value["datasets"][0],
            json!({
                "label": "Overall Sentiment",
                "data": [70.0],
                "borderColor": "rgb(75, 192, 192)",
                "backgroundColor": "rgba(75, 192, 192, 0.5)",
                "tension": 0.3,
                "fill": false
            })
        );
    }
}
