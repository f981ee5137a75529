use crate::cli::InferArgs;
use crate::error::{Error, Result};
use crate::model::{Model, NetworkConfig};
use crate::record;
use crate::training::VALIDATION_INPUTS;
use std::time::Instant;
use tracing::info;

/// `infer`サブコマンドを実行します。
pub fn run(args: &InferArgs) -> Result<()> {
    if !args.model_file.exists() {
        return Err(Error::InvalidConfig(format!(
            "モデルファイル '{}' が見つかりません。最初に 'train' コマンドでモデルを学習・保存してください。",
            args.model_file.display()
        )));
    }

    let config = NetworkConfig {
        hidden_size: args.hidden_size,
        ..NetworkConfig::default()
    };
    info!("保存済みモデルを '{}' からロード中...", args.model_file.display());
    let mut model = record::load_model(&args.model_file, config)?;

    let inputs: Vec<Vec<f64>> = match &args.input {
        Some(input) if input.len() != config.input_size => {
            return Err(Error::InvalidConfig(format!(
                "入力値は {} 個である必要があります (指定値: {:?})",
                config.input_size, input
            )));
        }
        Some(input) => vec![input.clone()],
        None => VALIDATION_INPUTS.iter().map(|x| x.to_vec()).collect(),
    };

    let inference_start = Instant::now();
    for (input, output) in predict(&mut model, &inputs, args) {
        println!("{:?} -> {:?}", input, output);
    }
    info!("=> 推論時間: {:.2?}", inference_start.elapsed());

    Ok(())
}

fn predict<'a>(
    model: &mut Model,
    inputs: &'a [Vec<f64>],
    args: &InferArgs,
) -> Vec<(&'a [f64], Vec<f64>)> {
    inputs
        .iter()
        .map(|input| (input.as_slice(), model.forward(input, args.activation)))
        .collect()
}
