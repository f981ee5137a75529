//! モデルのパラメータをテキストファイルに保存・復元します。
//!
//! 1行に1つの値を`Model::parameters()`の順序で書き出します。ヘッダはありません。

use crate::error::{Error, Result};
use crate::model::{Model, NetworkConfig};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// モデルのすべてのパラメータをファイルに書き出します。
pub fn save_model(model: &Model, path: impl AsRef<Path>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    for value in model.parameters() {
        // `{}` は f64 を往復可能な最短表現で出力する
        writeln!(writer, "{}", value)?;
    }
    writer.flush()?;
    Ok(())
}

/// ファイルからパラメータを読み込み、指定した構成のモデルを復元します。
pub fn load_model(path: impl AsRef<Path>, config: NetworkConfig) -> Result<Model> {
    let contents = fs::read_to_string(path.as_ref())?;
    let params = parse_parameters(&contents)?;
    Model::from_parameters(config, &params)
}

/// 1行に1つの浮動小数点数を読み取ります。空行は無視します。
pub fn parse_parameters(contents: &str) -> Result<Vec<f64>> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            line.trim().parse::<f64>().map_err(|e| Error::ModelFormat {
                line: index + 1,
                reason: format!("'{}': {}", line.trim(), e),
            })
        })
        .collect()
}
