use crate::cli::PlotArgs;
use crate::error::{Error, Result};
use crate::pinn::LossKind;
use crate::training::{EpochRecord, parse_log_line};
use plotters::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const ORANGE: RGBColor = RGBColor(255, 165, 0);

/// 値を対数スケールに変換し、[0, 1] に正規化します。
///
/// 最小値の絶対値 (と微小値) だけずらしてから対数を取るため、ゼロや負の値も扱えます。
pub fn log_normalize(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let logs: Vec<f64> = values
        .iter()
        .map(|v| (v + min.abs() + 1e-10).ln())
        .collect();
    let log_min = logs.iter().copied().fold(f64::INFINITY, f64::min);
    let log_max = logs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = log_max - log_min;
    if !range.is_finite() || range <= 0.0 {
        return vec![0.0; values.len()];
    }
    logs.iter().map(|l| (l - log_min) / range).collect()
}

/// ログファイル名 (`log_<kind>[_N].txt`) からグラフのタイトルを作ります。
pub fn title_for_log(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let run = stem.strip_prefix("log_").unwrap_or(stem);
    let (kind, run_number) = match run.rsplit_once('_') {
        Some((kind, n)) if !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()) => {
            (kind, Some(n))
        }
        _ => (run, None),
    };
    let name = kind
        .parse::<LossKind>()
        .map(|k| k.title().to_string())
        .unwrap_or_else(|_| kind.to_string());
    chart_title(&name, run_number)
}

/// 損失グラフのタイトル。
pub fn chart_title(name: &str, run_number: Option<&str>) -> String {
    match run_number {
        Some(n) => format!("{} Log-Normalized Training and Validation Loss ({})", name, n),
        None => format!("{} Log-Normalized Training and Validation Loss", name),
    }
}

/// 学習ログファイルを読み込みます。形式の異なる行は警告を出して読み飛ばします。
pub fn read_log(path: &Path) -> Result<Vec<EpochRecord>> {
    let contents = fs::read_to_string(path)?;
    let mut records = Vec::new();
    for line in contents.lines().filter(|l| !l.trim().is_empty()) {
        match parse_log_line(line) {
            Some(record) => records.push(record),
            None => warn!("認識できない行です: {}", line.trim()),
        }
    }
    Ok(records)
}

/// 学習過程の損失をグラフとしてPNGファイルに出力します。
pub fn plot_loss_history(records: &[EpochRecord], title: &str, path: &Path) -> Result<()> {
    if records.is_empty() {
        return Err(Error::Plot("描画するデータがありません".to_string()));
    }
    draw_chart(records, title, path).map_err(|e| Error::Plot(e.to_string()))
}

fn draw_chart(
    records: &[EpochRecord],
    title: &str,
    path: &Path,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let epochs: Vec<usize> = records.iter().map(|r| r.epoch).collect();
    let losses: Vec<f64> = records.iter().map(|r| r.loss).collect();
    let val_losses: Vec<f64> = records.iter().map(|r| r.validation_loss).collect();
    let normalized_losses = log_normalize(&losses);
    let normalized_val_losses = log_normalize(&val_losses);
    let max_epoch = epochs.iter().copied().max().unwrap_or(0);

    let root = BitMapBackend::new(path, (1400, 700)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0..max_epoch + 1, 0.0..1.1)?;
    chart
        .configure_mesh()
        .y_desc("Log-Normalized Loss")
        .x_desc("Epoch")
        .draw()?;
    chart
        .draw_series(LineSeries::new(
            epochs.iter().copied().zip(normalized_losses.iter().copied()),
            &BLUE,
        ))?
        .label("Normalized Training Loss")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));
    chart
        .draw_series(LineSeries::new(
            epochs.iter().copied().zip(normalized_val_losses.iter().copied()),
            &ORANGE,
        ))?
        .label("Normalized Validation Loss")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &ORANGE));

    // 検証損失の最小点と最大点に印を付ける
    let extremes = [
        ("Min Val Loss", arg_extreme(&val_losses, |a, b| a < b), BLUE),
        ("Max Val Loss", arg_extreme(&val_losses, |a, b| a > b), ORANGE),
    ];
    for (label, index, color) in extremes {
        let point = (epochs[index], normalized_val_losses[index]);
        chart.draw_series(std::iter::once(Circle::new(point, 4, color.filled())))?;
        chart.draw_series(std::iter::once(Text::new(
            format!("{}: {:.2}", label, point.1),
            (point.0, (point.1 + 0.05).min(1.05)),
            ("sans-serif", 15).into_font().color(&color),
        )))?;
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

/// `better(a, b)`が真になる最初の要素の位置を返します。
fn arg_extreme(values: &[f64], better: impl Fn(f64, f64) -> bool) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if better(v, values[best]) {
            best = i;
        }
    }
    best
}

/// `plot`サブコマンドを実行します。
pub fn run(args: &PlotArgs) -> Result<()> {
    let records = read_log(&args.log_file)?;
    let output = args.output.clone().unwrap_or_else(|| default_output(&args.log_file));
    plot_loss_history(&records, &title_for_log(&args.log_file), &output)?;
    info!("=> 損失グラフを '{}' に保存しました。", output.display());
    Ok(())
}

fn default_output(log_file: &Path) -> PathBuf {
    let stem = log_file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("log");
    let run = stem.strip_prefix("log_").unwrap_or(stem);
    log_file.with_file_name(format!("log_normalized_training_validation_loss_{}.png", run))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    #[test]
    fn log_normalize_maps_to_unit_interval() {
        let normalized = log_normalize(&[0.0, 1.0, 10.0]);
        assert_eq!(normalized[0], 0.0);
        assert_relative_eq!(normalized[2], 1.0);
        assert!(normalized[0] < normalized[1] && normalized[1] < normalized[2]);
    }

    #[test]
    fn log_normalize_degenerate_inputs() {
        assert!(log_normalize(&[]).is_empty());
        assert_eq!(log_normalize(&[1.0, 1.0, 1.0]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn title_from_file_name() {
        assert_eq!(
            title_for_log(Path::new("log_heat.txt")),
            "Heat Log-Normalized Training and Validation Loss"
        );
        assert_eq!(
            title_for_log(Path::new("runs/log_navier_stokes_3.txt")),
            "Navier-Stokes Log-Normalized Training and Validation Loss (3)"
        );
        assert_eq!(
            title_for_log(Path::new("custom.txt")),
            "custom Log-Normalized Training and Validation Loss"
        );
    }

    #[test]
    fn default_output_sits_next_to_log() {
        assert_eq!(
            default_output(Path::new("runs/log_wave_1.txt")),
            PathBuf::from("runs/log_normalized_training_validation_loss_wave_1.png")
        );
    }

    #[test]
    fn read_log_skips_unrecognized_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log_schrodinger.txt");
        fs::write(
            &path,
            "Epoch 0: Loss:  1.00250, Validation Loss: 1.01000\nnoise\nEpoch 1: Loss:  1.00200, Validation Loss: 1.00900\n",
        )
        .unwrap();
        let records = read_log(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].epoch, 1);
        assert_relative_eq!(records[1].validation_loss, 1.009);
    }

    #[test]
    fn arg_extreme_picks_first_match() {
        let values = [3.0, 1.0, 5.0, 1.0, 5.0];
        assert_eq!(arg_extreme(&values, |a, b| a < b), 1);
        assert_eq!(arg_extreme(&values, |a, b| a > b), 2);
    }

    #[test]
    fn empty_history_is_an_error() {
        let dir = tempdir().unwrap();
        let result = plot_loss_history(&[], "empty", &dir.path().join("x.png"));
        assert!(matches!(result, Err(Error::Plot(_))));
    }
}
