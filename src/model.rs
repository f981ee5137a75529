use crate::activation::{Activation, tanh_derivative};
use crate::error::{Error, Result};
use rand::Rng;

/// ネットワークの各層のユニット数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
}

impl NetworkConfig {
    pub fn new(input_size: usize, hidden_size: usize, output_size: usize) -> Self {
        Self {
            input_size,
            hidden_size,
            output_size,
        }
    }

    /// 重みとバイアスの総数。
    pub fn num_parameters(&self) -> usize {
        self.input_size * self.hidden_size
            + self.hidden_size * self.output_size
            + self.hidden_size
            + self.output_size
    }

    /// 各層のサイズが1以上であることを確認します。
    pub fn validate(&self) -> Result<()> {
        if self.input_size == 0 || self.hidden_size == 0 || self.output_size == 0 {
            return Err(Error::InvalidConfig(format!(
                "層のサイズは1以上である必要があります: {}-{}-{}",
                self.input_size, self.hidden_size, self.output_size
            )));
        }
        Ok(())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::new(2, 5, 3)
    }
}

/// 入力層・隠れ層・出力層からなる全結合ネットワーク。
///
/// 出力層は線形です。隠れ層の出力は直近の順伝播の値を保持し、
/// 逆伝播での重み更新に使用します。
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    config: NetworkConfig,
    /// `[input][hidden]`
    weights_input_hidden: Vec<Vec<f64>>,
    /// `[hidden][output]`
    weights_hidden_output: Vec<Vec<f64>>,
    biases_hidden: Vec<f64>,
    biases_output: Vec<f64>,
    hidden_outputs: Vec<f64>,
}

impl Model {
    /// すべての重みとバイアスを一様分布 [-1, 1) からサンプリングして初期化します。
    pub fn new<R: Rng>(config: NetworkConfig, rng: &mut R) -> Self {
        let mut sample = || rng.random_range(-1.0..1.0);

        let weights_input_hidden = (0..config.input_size)
            .map(|_| (0..config.hidden_size).map(|_| sample()).collect())
            .collect();
        let weights_hidden_output = (0..config.hidden_size)
            .map(|_| (0..config.output_size).map(|_| sample()).collect())
            .collect();
        let biases_hidden = (0..config.hidden_size).map(|_| sample()).collect();
        let biases_output = (0..config.output_size).map(|_| sample()).collect();

        Self {
            config,
            weights_input_hidden,
            weights_hidden_output,
            biases_hidden,
            biases_output,
            hidden_outputs: vec![0.0; config.hidden_size],
        }
    }

    /// `parameters()`と同じ順序の値からモデルを復元します。
    pub fn from_parameters(config: NetworkConfig, params: &[f64]) -> Result<Self> {
        config.validate()?;
        let expected = config.num_parameters();
        if params.len() != expected {
            return Err(Error::ParameterCount {
                expected,
                found: params.len(),
            });
        }

        let mut values = params.iter().copied();
        let mut take = |n: usize| values.by_ref().take(n).collect::<Vec<f64>>();

        let weights_input_hidden = (0..config.input_size)
            .map(|_| take(config.hidden_size))
            .collect();
        let weights_hidden_output = (0..config.hidden_size)
            .map(|_| take(config.output_size))
            .collect();
        let biases_hidden = take(config.hidden_size);
        let biases_output = take(config.output_size);

        Ok(Self {
            config,
            weights_input_hidden,
            weights_hidden_output,
            biases_hidden,
            biases_output,
            hidden_outputs: vec![0.0; config.hidden_size],
        })
    }

    pub fn config(&self) -> NetworkConfig {
        self.config
    }

    /// すべての重みとバイアスを一列に並べて返します。
    ///
    /// 入力→隠れ層の重み (入力ごと)、隠れ→出力層の重み (隠れユニットごと)、
    /// 隠れ層のバイアス、出力層のバイアスの順です。
    pub fn parameters(&self) -> Vec<f64> {
        let mut params = Vec::with_capacity(self.config.num_parameters());
        for row in &self.weights_input_hidden {
            params.extend(row.iter());
        }
        for row in &self.weights_hidden_output {
            params.extend(row.iter());
        }
        params.extend(self.biases_hidden.iter());
        params.extend(self.biases_output.iter());
        params
    }

    /// 初期化の妥当性を確認します。値がちょうど0のパラメータがあれば`false`です。
    pub fn validate_initialization(&self) -> bool {
        self.parameters().iter().all(|&value| value != 0.0)
    }

    /// 直近の順伝播で計算した隠れ層の出力。
    pub fn hidden_outputs(&self) -> &[f64] {
        &self.hidden_outputs
    }

    /// モデルの順伝播を実行します。
    ///
    /// 隠れ層の出力を内部に保存するため、`&mut self`を取ります。
    pub fn forward(&mut self, input: &[f64], activation: Activation) -> Vec<f64> {
        assert_eq!(input.len(), self.config.input_size, "入力サイズが一致しません");

        for j in 0..self.config.hidden_size {
            let mut sum = 0.0;
            for (i, x) in input.iter().enumerate() {
                sum += x * self.weights_input_hidden[i][j];
            }
            sum += self.biases_hidden[j];
            self.hidden_outputs[j] = activation.apply(sum);
        }

        (0..self.config.output_size)
            .map(|k| {
                let mut sum = 0.0;
                for (j, h) in self.hidden_outputs.iter().enumerate() {
                    sum += h * self.weights_hidden_output[j][k];
                }
                sum + self.biases_output[k]
            })
            .collect()
    }

    /// 1サンプル分の誤差で重みとバイアスを更新します。
    ///
    /// 目標値はすべての出力ユニットに共通です。隠れ層の誤差には、
    /// 順伝播の活性化関数に関係なく常にTanhの導関数を掛けます。
    pub fn update(&mut self, learning_rate: f64, input: &[f64], output: &[f64], target: f64) {
        assert_eq!(input.len(), self.config.input_size, "入力サイズが一致しません");
        assert_eq!(output.len(), self.config.output_size, "出力サイズが一致しません");

        let output_error: Vec<f64> = output.iter().map(|o| target - o).collect();

        let hidden_error: Vec<f64> = (0..self.config.hidden_size)
            .map(|j| {
                let propagated: f64 = output_error
                    .iter()
                    .zip(&self.weights_hidden_output[j])
                    .map(|(err, w)| err * w)
                    .sum();
                propagated * tanh_derivative(self.hidden_outputs[j])
            })
            .collect();

        for (j, row) in self.weights_hidden_output.iter_mut().enumerate() {
            for (k, w) in row.iter_mut().enumerate() {
                *w += learning_rate * output_error[k] * self.hidden_outputs[j];
            }
        }
        for (b, err) in self.biases_output.iter_mut().zip(&output_error) {
            *b += learning_rate * err;
        }

        for (i, row) in self.weights_input_hidden.iter_mut().enumerate() {
            for (j, w) in row.iter_mut().enumerate() {
                *w += learning_rate * hidden_error[j] * input[i];
            }
        }
        for (b, err) in self.biases_hidden.iter_mut().zip(&hidden_error) {
            *b += learning_rate * err;
        }
    }
}
