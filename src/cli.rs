use crate::MODEL_FILENAME;
use crate::activation::Activation;
use crate::pinn::{LossKind, LossParameters};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// clapでコマンドラインの構造を定義します。
#[derive(Parser, Debug)]
#[command(author, version, about = "A minimal physics-informed neural network trained on PDE residual losses", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 実行するサブコマンドを定義します（train, infer, plot）。
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// PINNモデルを学習し、結果をファイルに保存します
    Train(TrainArgs),
    /// 保存されたPINNモデルを使い、推論を実行します
    Infer(InferArgs),
    /// 学習ログから損失グラフを描画します
    Plot(PlotArgs),
}

/// `train`サブコマンドの引数。
#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// 損失関数: schrodinger, maxwell, heat, wave, navier_stokes
    #[arg(long)]
    pub loss: LossKind,

    /// 活性化関数: relu, sigmoid, tanh, leaky_relu
    #[arg(long)]
    pub activation: Activation,

    /// エポック数
    #[arg(long, default_value_t = 1000)]
    pub epochs: usize,

    /// 学習率の初期値
    #[arg(long, alias = "learning_rate", default_value_t = 0.01, allow_negative_numbers = true)]
    pub learning_rate: f64,

    /// ポテンシャル (schrodinger)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub potential: f64,

    /// 電荷密度 (maxwell)
    #[arg(long, alias = "charge_density", default_value_t = 0.0, allow_negative_numbers = true)]
    pub charge_density: f64,

    /// 電流密度 (maxwell)
    #[arg(long, alias = "current_density", default_value_t = 0.0, allow_negative_numbers = true)]
    pub current_density: f64,

    /// 熱伝導率 (heat)
    #[arg(long, alias = "thermal_conductivity", default_value_t = 0.0, allow_negative_numbers = true)]
    pub thermal_conductivity: f64,

    /// 波の速さ (wave)
    #[arg(long, alias = "wave_speed", default_value_t = 0.0, allow_negative_numbers = true)]
    pub wave_speed: f64,

    /// 粘性係数 (navier_stokes)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub viscosity: f64,

    /// 隠れ層のユニット数
    #[arg(long, default_value_t = 5)]
    pub hidden_size: usize,

    /// 重みの初期化に使う乱数シード (省略時はOSの乱数)
    #[arg(long)]
    pub seed: Option<u64>,

    /// 学習ログを書き込むディレクトリ
    #[arg(long, default_value = ".")]
    pub log_dir: PathBuf,

    /// 学習済みモデルの保存先
    #[arg(long, default_value = MODEL_FILENAME)]
    pub model_file: PathBuf,

    /// 損失グラフ (PNG) の保存先
    #[arg(long)]
    pub plot: Option<PathBuf>,

    /// 進捗を出力する間隔 (エポック数、0で無効)
    #[arg(long, default_value_t = 100)]
    pub report_every: usize,
}

impl TrainArgs {
    pub fn loss_parameters(&self) -> LossParameters {
        LossParameters {
            potential: self.potential,
            charge_density: self.charge_density,
            current_density: self.current_density,
            thermal_conductivity: self.thermal_conductivity,
            wave_speed: self.wave_speed,
            viscosity: self.viscosity,
        }
    }
}

/// `infer`サブコマンドの引数。
#[derive(Args, Debug, Clone)]
pub struct InferArgs {
    /// 学習済みモデルのファイル
    #[arg(long, default_value = MODEL_FILENAME)]
    pub model_file: PathBuf,

    /// 学習時と同じ活性化関数
    #[arg(long)]
    pub activation: Activation,

    /// 学習時と同じ隠れ層のユニット数
    #[arg(long, default_value_t = 5)]
    pub hidden_size: usize,

    /// 入力値 (省略時は検証用の入力すべて)
    #[arg(long, num_args = 2, value_names = ["X1", "X2"], allow_negative_numbers = true)]
    pub input: Option<Vec<f64>>,
}

/// `plot`サブコマンドの引数。
#[derive(Args, Debug, Clone)]
pub struct PlotArgs {
    /// 学習ログファイル (log_<loss>.txt)
    pub log_file: PathBuf,

    /// 出力するPNGファイル
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
