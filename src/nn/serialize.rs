//! Named parameter snapshots of an [`Fcnn`].
//!
//! A [`StateDict`] maps PyTorch-style parameter names (`encoder.0.weight`,
//! `encoder.1.running_var`, ...) to flat data and shape. It is plain data:
//! weights can be inspected by name, copied between networks of the same
//! architecture, or written as JSON by the caller.
//!
//! # Example
//!
//! ```
//! use sparse_fcnn::nn::serialize::{load_state_dict, state_dict};
//! use sparse_fcnn::nn::{Activation, Fcnn};
//!
//! let trained = Fcnn::new(4, 6, Activation::Relu, false, 1).expect("sizes");
//! let mut fresh = Fcnn::new(4, 6, Activation::Relu, false, 2).expect("sizes");
//!
//! let state = state_dict(&trained);
//! assert_eq!(state["encoder.0.weight"].1, vec![6, 4]);
//! load_state_dict(&mut fresh, &state).expect("same architecture");
//! assert_eq!(fresh, trained);
//! ```

use std::collections::BTreeMap;

use super::network::{Fcnn, LayerId};
use crate::error::{Result, SparseError};

/// Parameter name → (flat data, shape).
pub type StateDict = BTreeMap<String, (Vec<f32>, Vec<usize>)>;

const NORM_PREFIX: &str = "encoder.1";

/// Copies every parameter and running statistic of `network`.
#[must_use]
pub fn state_dict(network: &Fcnn) -> StateDict {
    let mut state = StateDict::new();
    for id in LayerId::ALL {
        for (name, data, shape) in network.layer(id).tensors() {
            state.insert(format!("{}.{name}", id.prefix()), (data.to_vec(), shape));
        }
    }
    if let Some(norm) = network.norm() {
        for (name, data) in norm.tensors() {
            state.insert(
                format!("{NORM_PREFIX}.{name}"),
                (data.to_vec(), vec![data.len()]),
            );
        }
    }
    state
}

/// Overwrites the parameters of `network` with `state`.
///
/// Every tensor of the network must be present with a matching element
/// count; extra entries are rejected too. On error `network` is unchanged.
///
/// # Errors
///
/// Returns an error on a missing, extra or wrongly sized tensor.
pub fn load_state_dict(network: &mut Fcnn, state: &StateDict) -> Result<()> {
    let expected = state_dict(network);
    for (name, (data, _)) in &expected {
        let (given, _) = state
            .get(name)
            .ok_or_else(|| SparseError::Serialization(format!("missing tensor {name}")))?;
        if given.len() != data.len() {
            return Err(SparseError::dimension_mismatch(name, data.len(), given.len()));
        }
    }
    if let Some(extra) = state.keys().find(|k| !expected.contains_key(*k)) {
        return Err(SparseError::Serialization(format!("unexpected tensor {extra}")));
    }

    let copy = |dst: &mut [f32], key: String| {
        if let Some((src, _)) = state.get(&key) {
            dst.copy_from_slice(src);
        }
    };
    for id in LayerId::ALL {
        let [weight, bias] = network.layer_mut(id).tensors_mut();
        copy(weight, format!("{}.weight", id.prefix()));
        copy(bias, format!("{}.bias", id.prefix()));
    }
    if let Some(norm) = network.norm_mut() {
        let names = ["weight", "bias", "running_mean", "running_var"];
        for (dst, name) in norm.tensors_mut().into_iter().zip(names) {
            copy(dst, format!("{NORM_PREFIX}.{name}"));
        }
    }
    Ok(())
}

/// Total number of stored values, running statistics included.
#[must_use]
pub fn count_parameters(network: &Fcnn) -> usize {
    state_dict(network).values().map(|(data, _)| data.len()).sum()
}

/// Serializes the whole network (architecture and state) as JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json(network: &Fcnn) -> Result<String> {
    serde_json::to_string(network).map_err(|e| SparseError::Serialization(e.to_string()))
}

/// Reads a network written by [`to_json`].
///
/// # Errors
///
/// Returns an error if `json` isn't a serialized network.
pub fn from_json(json: &str) -> Result<Fcnn> {
    serde_json::from_str(json).map_err(|e| SparseError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::Activation;
    use crate::primitives::Matrix;

    #[test]
    fn test_names_and_shapes() {
        let net = Fcnn::new(5, 3, Activation::Tanh, true, 0).expect("sizes");
        let state = state_dict(&net);
        let names: Vec<&str> = state.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec![
                "encoder.0.bias",
                "encoder.0.weight",
                "encoder.1.bias",
                "encoder.1.running_mean",
                "encoder.1.running_var",
                "encoder.1.weight",
                "encoder.3.bias",
                "encoder.3.weight",
                "encoder.5.bias",
                "encoder.5.weight",
            ]
        );
        assert_eq!(state["encoder.5.weight"].1, vec![1, 3]);
        // 15 + 3 + 4*3 + 9 + 3 + 3 + 1
        assert_eq!(count_parameters(&net), 46);
    }

    #[test]
    fn test_load_rejects_other_architectures() {
        let small = Fcnn::new(4, 3, Activation::Tanh, false, 0).expect("sizes");
        let mut wide = Fcnn::new(4, 5, Activation::Tanh, false, 0).expect("sizes");
        let before = wide.clone();
        assert!(load_state_dict(&mut wide, &state_dict(&small)).is_err());
        assert_eq!(wide, before);

        let mut with_norm = Fcnn::new(4, 3, Activation::Tanh, true, 0).expect("sizes");
        let err = load_state_dict(&mut with_norm, &state_dict(&small)).expect_err("no bn tensors");
        assert!(matches!(err, SparseError::Serialization(_)));

        let mut plain = small.clone();
        let mut extra = state_dict(&small);
        extra.insert("encoder.9.weight".into(), (vec![0.0], vec![1]));
        assert!(load_state_dict(&mut plain, &extra).is_err());
    }

    #[test]
    fn test_json_keeps_predictions() {
        let net = Fcnn::new(3, 4, Activation::Gelu, true, 7).expect("sizes");
        let restored = from_json(&to_json(&net).expect("serializable")).expect("valid json");
        let x = Matrix::from_rows(&[vec![0.1, -0.2, 0.3], vec![1.0, 0.5, -1.0]]).expect("rect");
        let a = net.predict(&x).expect("3 columns");
        let b = restored.predict(&x).expect("3 columns");
        for (p, q) in a.as_slice().iter().zip(b.as_slice()) {
            assert!((p - q).abs() < 1e-6);
        }
        assert!(from_json("{\"not\": \"a network\"}").is_err());
    }
}
