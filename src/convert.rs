//! Conversion of raw parameter strings into typed values.
//!
//! Descriptors may carry raw parameters (`"port" => "8080"`). When a
//! dependency has a parameter of the same name and some converter handles the
//! dependency's contract, the converted value is injected instead of a
//! registered component.

use std::any::TypeId;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::error::{DiError, DiResult};
use crate::key::{service_value, AnyArc, Contract};

/// Turns raw strings into values of a contract.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{contract_of, service_value, AnyArc, Contract, Converter, DiError, DiResult};
/// use std::sync::Arc;
///
/// #[derive(Debug, PartialEq)]
/// struct Hosts(Vec<String>);
///
/// struct HostsConverter;
///
/// impl Converter for HostsConverter {
///     fn can_convert(&self, target: &Contract) -> bool {
///         *target == contract_of::<Hosts>()
///     }
///
///     fn convert(&self, raw: &str, _target: &Contract) -> DiResult<AnyArc> {
///         let hosts = raw.split(',').map(|h| h.trim().to_string()).collect();
///         Ok(service_value(Arc::new(Hosts(hosts))))
///     }
/// }
///
/// assert!(HostsConverter.can_convert(&contract_of::<Hosts>()));
/// ```
pub trait Converter: Send + Sync {
    fn can_convert(&self, target: &Contract) -> bool;

    /// Converts `raw`; the value is returned in storage form, see
    /// [`service_value`](crate::service_value).
    fn convert(&self, raw: &str, target: &Contract) -> DiResult<AnyArc>;
}

type ParseFn = fn(&str) -> Result<AnyArc, String>;

fn parse<T>(raw: &str) -> Result<AnyArc, String>
where
    T: FromStr + Send + Sync + 'static,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map(|value| service_value(Arc::new(value)))
        .map_err(|e| e.to_string())
}

fn parse_millis(raw: &str) -> Result<AnyArc, String> {
    raw.trim()
        .parse::<u64>()
        .map(|ms| service_value(Arc::new(Duration::from_millis(ms))))
        .map_err(|e| e.to_string())
}

/// Strings, booleans, characters, integers, floats and durations (in milliseconds).
pub struct PrimitiveConverter {
    parsers: HashMap<TypeId, ParseFn>,
}

macro_rules! parsers {
    ($map:ident: $($ty:ty),* $(,)?) => {
        $( $map.insert(TypeId::of::<$ty>(), parse::<$ty> as ParseFn); )*
    };
}

impl Default for PrimitiveConverter {
    fn default() -> Self {
        let mut parsers = HashMap::new();
        parsers!(parsers:
            String, bool, char,
            i8, i16, i32, i64, i128, isize,
            u8, u16, u32, u64, u128, usize,
            f32, f64,
        );
        parsers.insert(TypeId::of::<Duration>(), parse_millis as ParseFn);
        Self { parsers }
    }
}

impl Converter for PrimitiveConverter {
    fn can_convert(&self, target: &Contract) -> bool {
        self.parsers.contains_key(&target.id())
    }

    fn convert(&self, raw: &str, target: &Contract) -> DiResult<AnyArc> {
        let parse = self.parsers.get(&target.id()).ok_or_else(|| DiError::Conversion {
            parameter: raw.to_string(),
            target: target.name().to_string(),
            reason: "no primitive parser".to_string(),
        })?;
        parse(raw).map_err(|reason| DiError::Conversion {
            parameter: raw.to_string(),
            target: target.name().to_string(),
            reason,
        })
    }
}

/// Ordered set of converters; the most recently added one wins.
pub(crate) struct ConversionManager {
    converters: RwLock<Vec<Arc<dyn Converter>>>,
}

impl Default for ConversionManager {
    fn default() -> Self {
        Self {
            converters: RwLock::new(vec![Arc::new(PrimitiveConverter::default())]),
        }
    }
}

impl ConversionManager {
    pub(crate) fn add(&self, converter: Arc<dyn Converter>) {
        self.converters.write().push(converter);
    }

    fn find(&self, target: &Contract) -> Option<Arc<dyn Converter>> {
        self.converters
            .read()
            .iter()
            .rev()
            .find(|converter| converter.can_convert(target))
            .cloned()
    }

    pub(crate) fn can_convert(&self, target: &Contract) -> bool {
        self.find(target).is_some()
    }

    /// Converts the raw parameter `name` for a dependency on `target`.
    pub(crate) fn convert(&self, name: &str, raw: &str, target: &Contract) -> DiResult<AnyArc> {
        let converter = self.find(target).ok_or_else(|| DiError::Conversion {
            parameter: name.to_string(),
            target: target.name().to_string(),
            reason: "no converter registered".to_string(),
        })?;
        converter.convert(raw, target).map_err(|error| match error {
            DiError::Conversion { target, reason, .. } => DiError::Conversion {
                parameter: name.to_string(),
                target,
                reason,
            },
            other => other,
        })
    }
}
