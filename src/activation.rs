use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// Leaky ReLUの負側の傾き
pub const LEAKY_RELU_ALPHA: f64 = 0.01;

/// この範囲を超えるとTanhは±1.0に固定されます。
const TANH_CLAMP: f64 = 20.0;

/// 隠れ層で使用する活性化関数。
///
/// 順伝播のみに影響します。逆伝播は常にTanhの導関数を使います。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Relu,
    Sigmoid,
    Tanh,
    LeakyRelu,
}

impl Activation {
    /// 活性化関数を適用します。
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            Activation::Relu => {
                if x < 0.0 {
                    0.0
                } else {
                    x
                }
            }
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => clamped_tanh(x),
            Activation::LeakyRelu => {
                if x > 0.0 {
                    x
                } else {
                    LEAKY_RELU_ALPHA * x
                }
            }
        }
    }

    /// コマンドラインやファイル名で使う名前。
    pub fn as_str(&self) -> &'static str {
        match self {
            Activation::Relu => "relu",
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
            Activation::LeakyRelu => "leaky_relu",
        }
    }
}

impl FromStr for Activation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relu" => Ok(Activation::Relu),
            "sigmoid" => Ok(Activation::Sigmoid),
            "tanh" => Ok(Activation::Tanh),
            "leaky_relu" => Ok(Activation::LeakyRelu),
            other => Err(Error::UnsupportedActivation(other.to_string())),
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// オーバーフローを避けるため、|x| > 20 では厳密に±1.0を返すTanh。
fn clamped_tanh(x: f64) -> f64 {
    if x < -TANH_CLAMP {
        return -1.0;
    }
    if x > TANH_CLAMP {
        return 1.0;
    }
    let exp_pos = x.exp();
    let exp_neg = (-x).exp();
    (exp_pos - exp_neg) / (exp_pos + exp_neg)
}

/// `1 - tanh(x)^2`
pub fn tanh_derivative(x: f64) -> f64 {
    let t = x.tanh();
    1.0 - t * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn tanh_is_clamped_outside_twenty() {
        assert_eq!(Activation::Tanh.apply(21.0), 1.0);
        assert_eq!(Activation::Tanh.apply(-21.0), -1.0);
        assert_eq!(Activation::Tanh.apply(1e6), 1.0);
        assert_eq!(Activation::Tanh.apply(-1e6), -1.0);
    }

    #[test]
    fn tanh_matches_library_inside_clamp() {
        for x in [-20.0, -3.0, -0.5, 0.0, 0.25, 2.0, 19.5] {
            assert_relative_eq!(Activation::Tanh.apply(x), f64::tanh(x), epsilon = 1e-12);
        }
        // 境界付近でも連続
        assert_relative_eq!(Activation::Tanh.apply(20.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn relu_and_leaky_relu() {
        assert_eq!(Activation::Relu.apply(-3.0), 0.0);
        assert_eq!(Activation::Relu.apply(2.5), 2.5);
        assert_relative_eq!(Activation::LeakyRelu.apply(-2.0), -0.02);
        assert_eq!(Activation::LeakyRelu.apply(4.0), 4.0);
        assert_eq!(Activation::LeakyRelu.apply(0.0), 0.0);
    }

    #[test]
    fn sigmoid_values() {
        assert_eq!(Activation::Sigmoid.apply(0.0), 0.5);
        assert!(Activation::Sigmoid.apply(-800.0) >= 0.0);
        assert_relative_eq!(Activation::Sigmoid.apply(800.0), 1.0);
    }

    #[test]
    fn tanh_derivative_values() {
        assert_eq!(tanh_derivative(0.0), 1.0);
        assert_relative_eq!(tanh_derivative(0.5), 1.0 - 0.5f64.tanh().powi(2));
        assert!(tanh_derivative(50.0) >= 0.0);
    }

    #[test]
    fn parses_names() {
        assert_eq!("relu".parse::<Activation>().unwrap(), Activation::Relu);
        assert_eq!("leaky_relu".parse::<Activation>().unwrap(), Activation::LeakyRelu);
        assert!(matches!(
            "softmax".parse::<Activation>(),
            Err(Error::UnsupportedActivation(name)) if name == "softmax"
        ));
        for kind in [Activation::Relu, Activation::Sigmoid, Activation::Tanh, Activation::LeakyRelu] {
            assert_eq!(kind.to_string().parse::<Activation>().unwrap(), kind);
        }
    }
}
