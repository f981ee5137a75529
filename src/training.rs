use crate::activation::Activation;
use crate::cli::TrainArgs;
use crate::error::{Error, Result};
use crate::model::{Model, NetworkConfig};
use crate::pinn::{LossKind, LossParameters};
use crate::plot;
use crate::record;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// 学習に使う唯一のサンプル
pub const TRAINING_INPUT: [f64; 2] = [1.0, 2.0];
pub const TRAINING_TARGET: f64 = 1.0;

/// 検証用のサンプル (入力は {1,2} から {3,4} まで等間隔)
pub const VALIDATION_INPUTS: [[f64; 2]; 5] =
    [[1.0, 2.0], [1.5, 2.5], [2.0, 3.0], [2.5, 3.5], [3.0, 4.0]];
pub const VALIDATION_TARGETS: [f64; 5] = [1.0, 1.5, 2.0, 2.5, 3.0];

/// 学習率の減衰係数
pub const LEARNING_RATE_DECAY: f64 = 0.01;

/// `initial_rate / (1 + decay_rate * epoch)`
pub fn adaptive_learning_rate(initial_rate: f64, epoch: usize, decay_rate: f64) -> f64 {
    initial_rate / (1.0 + decay_rate * epoch as f64)
}

/// 学習の設定。学習開始前に決定し、学習中は変更しません。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingConfig {
    pub loss: LossKind,
    pub activation: Activation,
    pub epochs: usize,
    pub learning_rate: f64,
    pub decay_rate: f64,
    pub params: LossParameters,
    /// 何エポックごとに進捗を出力するか
    pub report_every: usize,
}

impl TrainingConfig {
    pub fn new(loss: LossKind, activation: Activation) -> Self {
        Self {
            loss,
            activation,
            epochs: 1000,
            learning_rate: 0.01,
            decay_rate: LEARNING_RATE_DECAY,
            params: LossParameters::default(),
            report_every: 100,
        }
    }

    /// ネットワーク構成と組み合わせて学習できるかを確認します。
    pub fn validate(&self, network: &NetworkConfig) -> Result<()> {
        network.validate()?;
        if network.input_size != TRAINING_INPUT.len() {
            return Err(Error::InvalidConfig(format!(
                "入力層のサイズは {} である必要があります (指定値: {})",
                TRAINING_INPUT.len(),
                network.input_size
            )));
        }
        if network.output_size < self.loss.required_outputs() {
            return Err(Error::InvalidConfig(format!(
                "損失関数 {} には {} 個以上の出力が必要です (指定値: {})",
                self.loss,
                self.loss.required_outputs(),
                network.output_size
            )));
        }
        if !self.learning_rate.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "学習率が不正です: {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// 1エポック分の学習結果。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochRecord {
    pub epoch: usize,
    pub loss: f64,
    pub validation_loss: f64,
}

impl EpochRecord {
    /// 学習ログファイルの1行 (改行なし)。
    pub fn to_log_line(&self) -> String {
        format!(
            "Epoch {}: Loss:  {:.5}, Validation Loss: {:.5}",
            self.epoch, self.loss, self.validation_loss
        )
    }
}

/// 学習ログの1行を読み取ります。形式が異なる場合は`None`です。
pub fn parse_log_line(line: &str) -> Option<EpochRecord> {
    let rest = line.trim().strip_prefix("Epoch ")?;
    let (epoch, rest) = rest.split_once(": Loss:")?;
    let (loss, validation_loss) = rest.split_once(", Validation Loss:")?;
    Some(EpochRecord {
        epoch: epoch.trim().parse().ok()?,
        loss: loss.trim().parse().ok()?,
        validation_loss: validation_loss.trim().parse().ok()?,
    })
}

/// 既存のログを上書きしないファイル名を決定します。
///
/// `log_<kind>.txt` が存在すれば `log_<kind>_1.txt`, `log_<kind>_2.txt`, ... を試します。
pub fn resolve_log_path(dir: &Path, loss: LossKind) -> PathBuf {
    let mut path = dir.join(format!("log_{}.txt", loss));
    let mut run_number = 0;
    while path.exists() {
        run_number += 1;
        path = dir.join(format!("log_{}_{}.txt", loss, run_number));
    }
    path
}

/// エポックごとの学習ログの書き込み先。
///
/// ファイルを開けない場合や書き込みに失敗した場合は警告を出し、学習は継続します。
#[derive(Debug)]
pub struct TrainingLog {
    path: Option<PathBuf>,
    file: Option<File>,
}

impl TrainingLog {
    /// `dir`内に新しいログファイルを作成します。
    pub fn create(dir: &Path, loss: LossKind) -> Self {
        let path = resolve_log_path(dir, loss);
        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Some(file),
            Err(e) => {
                warn!("ログファイル '{}' を開けませんでした: {}", path.display(), e);
                None
            }
        };
        Self {
            path: Some(path),
            file,
        }
    }

    /// 何も書き込まないログ。
    pub fn disabled() -> Self {
        Self {
            path: None,
            file: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn append(&mut self, record: &EpochRecord) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        if let Err(e) = writeln!(file, "{}", record.to_log_line()) {
            warn!("ログの書き込みに失敗しました: {}", e);
        }
    }
}

/// 検証用サンプルに対する損失の平均を計算します。
pub fn validation_loss(model: &mut Model, config: &TrainingConfig) -> f64 {
    let total: f64 = VALIDATION_INPUTS
        .iter()
        .zip(VALIDATION_TARGETS)
        .map(|(input, target)| {
            let output = model.forward(input, config.activation);
            config.loss.evaluate(&output, target, &config.params)
        })
        .sum();
    total / VALIDATION_INPUTS.len() as f64
}

/// 学習ループを実行し、エポックごとの損失を返します。
///
/// 各エポックで学習サンプルを1回だけ順伝播・更新し、その後に検証損失を計算します。
pub fn train(
    model: &mut Model,
    config: &TrainingConfig,
    log: &mut TrainingLog,
) -> Result<Vec<EpochRecord>> {
    config.validate(&model.config())?;

    let mut history = Vec::with_capacity(config.epochs);
    for epoch in 0..config.epochs {
        let learning_rate = adaptive_learning_rate(config.learning_rate, epoch, config.decay_rate);

        let output = model.forward(&TRAINING_INPUT, config.activation);
        let loss = config.loss.evaluate(&output, TRAINING_TARGET, &config.params);
        model.update(learning_rate, &TRAINING_INPUT, &output, TRAINING_TARGET);

        let validation_loss = validation_loss(model, config);
        let record = EpochRecord {
            epoch,
            loss,
            validation_loss,
        };
        log.append(&record);

        debug!(epoch, loss, validation_loss, learning_rate, "エポック完了");
        if config.report_every > 0 && (epoch + 1) % config.report_every == 0 {
            info!(
                "[Epoch {}] Loss: {:.6}, Validation Loss: {:.6}",
                epoch, loss, validation_loss
            );
        }
        history.push(record);
    }
    Ok(history)
}

/// `train`サブコマンドを実行します。
///
/// ネットワークの初期化、学習、モデルの保存、(指定があれば) 損失グラフの描画を行います。
pub fn run(args: &TrainArgs) -> Result<()> {
    let network = NetworkConfig {
        hidden_size: args.hidden_size,
        ..NetworkConfig::default()
    };
    let config = TrainingConfig {
        epochs: args.epochs,
        learning_rate: args.learning_rate,
        params: args.loss_parameters(),
        report_every: args.report_every,
        ..TrainingConfig::new(args.loss, args.activation)
    };
    config.validate(&network)?;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut model = Model::new(network, &mut rng);
    if !model.validate_initialization() {
        return Err(Error::InvalidInitialization);
    }

    let mut log = TrainingLog::create(&args.log_dir, config.loss);
    info!(
        "学習を開始します (損失関数: {}, 活性化関数: {}, エポック数: {}, 学習率: {})",
        config.loss, config.activation, config.epochs, config.learning_rate
    );
    let training_start = Instant::now();
    let history = train(&mut model, &config, &mut log)?;
    info!("学習が完了しました。");
    info!("=> 学習時間: {:.2?}", training_start.elapsed());
    if let (Some(path), Some(last)) = (log.path(), history.last()) {
        info!(
            "=> 最終損失: {:.6}, 検証損失: {:.6} (ログ: '{}')",
            last.loss,
            last.validation_loss,
            path.display()
        );
    }

    if let Some(plot_path) = &args.plot {
        match plot::plot_loss_history(
            &history,
            &plot::chart_title(config.loss.title(), None),
            plot_path,
        ) {
            Ok(()) => info!("=> 損失グラフを '{}' に保存しました。", plot_path.display()),
            Err(e) => error!("{}", e),
        }
    }

    match record::save_model(&model, &args.model_file) {
        Ok(()) => info!("=> モデルを '{}' に保存しました。", args.model_file.display()),
        Err(e) => error!(
            "モデルの保存に失敗しました ('{}'): {}",
            args.model_file.display(),
            e
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::fs;
    use tempfile::tempdir;

    fn seeded_model(seed: u64) -> Model {
        Model::new(NetworkConfig::default(), &mut StdRng::seed_from_u64(seed))
    }

    #[test]
    fn learning_rate_decays_hyperbolically() {
        assert_eq!(adaptive_learning_rate(0.01, 0, LEARNING_RATE_DECAY), 0.01);
        assert_relative_eq!(adaptive_learning_rate(1.0, 100, LEARNING_RATE_DECAY), 0.5);
        assert_relative_eq!(adaptive_learning_rate(0.3, 50, 0.02), 0.15);
    }

    #[test]
    fn log_path_is_numbered_on_collision() {
        let dir = tempdir().unwrap();
        let first = resolve_log_path(dir.path(), LossKind::Heat);
        assert_eq!(first, dir.path().join("log_heat.txt"));

        fs::write(&first, "").unwrap();
        let second = resolve_log_path(dir.path(), LossKind::Heat);
        assert_eq!(second, dir.path().join("log_heat_1.txt"));

        fs::write(&second, "").unwrap();
        assert_eq!(
            resolve_log_path(dir.path(), LossKind::Heat),
            dir.path().join("log_heat_2.txt")
        );
        assert_eq!(
            resolve_log_path(dir.path(), LossKind::NavierStokes),
            dir.path().join("log_navier_stokes.txt")
        );
    }

    #[test]
    fn log_line_format_and_parse() {
        let record = EpochRecord {
            epoch: 12,
            loss: 1.0025,
            validation_loss: 0.5,
        };
        let line = record.to_log_line();
        assert_eq!(line, "Epoch 12: Loss:  1.00250, Validation Loss: 0.50000");
        assert_eq!(parse_log_line(&line), Some(record));
        assert_eq!(parse_log_line("garbage"), None);
        assert_eq!(parse_log_line("Epoch x: Loss: 1.0, Validation Loss: 2.0"), None);
    }

    #[test]
    fn rejects_inconsistent_topology() {
        let config = TrainingConfig::new(LossKind::NavierStokes, Activation::Tanh);
        assert!(config.validate(&NetworkConfig::new(2, 5, 1)).is_err());
        assert!(config.validate(&NetworkConfig::new(3, 5, 3)).is_err());
        assert!(config.validate(&NetworkConfig::default()).is_ok());

        let heat = TrainingConfig::new(LossKind::Heat, Activation::Tanh);
        assert!(heat.validate(&NetworkConfig::new(2, 8, 1)).is_ok());

        let bad_rate = TrainingConfig {
            learning_rate: f64::NAN,
            ..heat
        };
        assert!(matches!(
            bad_rate.validate(&NetworkConfig::default()),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn train_returns_one_record_per_epoch() {
        let mut model = seeded_model(1);
        let config = TrainingConfig {
            epochs: 25,
            ..TrainingConfig::new(LossKind::Schrodinger, Activation::Sigmoid)
        };
        let history = train(&mut model, &config, &mut TrainingLog::disabled()).unwrap();
        assert_eq!(history.len(), 25);
        for (i, record) in history.iter().enumerate() {
            assert_eq!(record.epoch, i);
            assert!(record.loss.is_finite() && record.loss >= 0.0);
            assert!(record.validation_loss.is_finite() && record.validation_loss >= 0.0);
        }
    }

    #[test]
    fn training_loss_is_measured_before_update() {
        let mut model = seeded_model(9);
        let mut probe = model.clone();
        let output = probe.forward(&TRAINING_INPUT, Activation::Tanh);
        let params = LossParameters {
            viscosity: 0.5,
            ..Default::default()
        };
        let expected = LossKind::NavierStokes.evaluate(&output, TRAINING_TARGET, &params);

        let config = TrainingConfig {
            epochs: 1,
            params,
            ..TrainingConfig::new(LossKind::NavierStokes, Activation::Tanh)
        };
        let history = train(&mut model, &config, &mut TrainingLog::disabled()).unwrap();
        assert_eq!(history[0].loss, expected);
        assert_ne!(model.parameters(), probe.parameters());
    }

    #[test]
    fn validation_loss_averages_samples() {
        let mut model = seeded_model(4);
        let config = TrainingConfig::new(LossKind::Maxwell, Activation::Relu);
        let mut probe = model.clone();
        let expected: f64 = VALIDATION_INPUTS
            .iter()
            .map(|input| {
                let output = probe.forward(input, Activation::Relu);
                output[0] * output[0]
            })
            .sum::<f64>()
            / 5.0;
        assert_relative_eq!(validation_loss(&mut model, &config), expected, max_relative = 1e-12);
    }

    #[test]
    fn zero_epochs_leave_model_untouched() {
        let mut model = seeded_model(8);
        let before = model.parameters();
        let config = TrainingConfig {
            epochs: 0,
            ..TrainingConfig::new(LossKind::Wave, Activation::LeakyRelu)
        };
        let history = train(&mut model, &config, &mut TrainingLog::disabled()).unwrap();
        assert!(history.is_empty());
        assert_eq!(model.parameters(), before);
    }

    #[test]
    fn log_writes_one_line_per_epoch() {
        let dir = tempdir().unwrap();
        let mut log = TrainingLog::create(dir.path(), LossKind::Wave);
        let mut model = seeded_model(5);
        let config = TrainingConfig {
            epochs: 3,
            ..TrainingConfig::new(LossKind::Wave, Activation::Tanh)
        };
        train(&mut model, &config, &mut log).unwrap();
        drop(log);

        let contents = fs::read_to_string(dir.path().join("log_wave.txt")).unwrap();
        let records: Vec<EpochRecord> = contents.lines().filter_map(parse_log_line).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].epoch, 2);
    }

    #[test]
    fn unwritable_log_does_not_stop_training() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("no").join("such").join("dir");
        let mut log = TrainingLog::create(&missing, LossKind::Heat);
        let mut model = seeded_model(6);
        let config = TrainingConfig {
            epochs: 2,
            ..TrainingConfig::new(LossKind::Heat, Activation::Relu)
        };
        let history = train(&mut model, &config, &mut log).unwrap();
        assert_eq!(history.len(), 2);
    }
}
