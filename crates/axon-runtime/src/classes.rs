//! Typed wrappers for the shipped function classes
//!
//! These stand in for the generated per-class bindings: thin delegation
//! over the generic proxy, one find/first/next trio per class plus the
//! class's typed accessors. Nothing here talks to a hub directly.

use axon_core::{AttrValue, AxonError};
use std::sync::Arc;

use crate::proxy::FunctionProxy;
use crate::Axon;

/// Ambient light sensor
#[derive(Clone)]
pub struct LightSensor {
    proxy: Arc<FunctionProxy>,
}

impl LightSensor {
    pub const CLASS: &'static str = "LightSensor";

    /// Proxy for the given identifier; valid even while the sensor is
    /// offline
    pub async fn find(axon: &Axon, identifier: &str) -> Self {
        Self {
            proxy: axon.find_or_create(Self::CLASS, identifier).await,
        }
    }

    /// First light sensor currently online, if any
    pub async fn first(axon: &Axon) -> Result<Option<Self>, AxonError> {
        match axon.first_hardware_id(Self::CLASS).await? {
            Some(id) => Ok(Some(Self::find(axon, id.as_str()).await)),
            None => Ok(None),
        }
    }

    /// Continue the enumeration started by [`LightSensor::first`]
    pub async fn next_sensor(&self) -> Result<Option<Self>, AxonError> {
        let axon = self.proxy.runtime_handle()?;
        let resolved = self.proxy.resolve().await?;
        match axon
            .next_hardware_id(Self::CLASS, &resolved.hardware_id)
            .await?
        {
            Some(id) => Ok(Some(Self::find(&axon, id.as_str()).await)),
            None => Ok(None),
        }
    }

    pub async fn is_online(&self) -> bool {
        self.proxy.is_online().await
    }

    /// Current light level, in the sensor's unit
    pub async fn current_value(&self) -> Result<f64, AxonError> {
        self.proxy.get_float("currentValue").await
    }

    pub async fn unit(&self) -> Result<String, AxonError> {
        self.proxy.get_string("unit").await
    }

    pub async fn logical_name(&self) -> Result<String, AxonError> {
        self.proxy.get_string("logicalName").await
    }

    pub async fn set_logical_name(&self, name: &str) -> Result<i32, AxonError> {
        self.proxy.set_attr("logicalName", AttrValue::from(name)).await
    }

    pub fn proxy(&self) -> &Arc<FunctionProxy> {
        &self.proxy
    }
}

/// Time-of-flight range finder
#[derive(Clone)]
pub struct RangeFinder {
    proxy: Arc<FunctionProxy>,
}

impl RangeFinder {
    pub const CLASS: &'static str = "RangeFinder";

    /// Running mode: balanced default
    pub const MODE_DEFAULT: i64 = 0;
    /// Running mode: priority on maximum range
    pub const MODE_LONG_RANGE: i64 = 1;
    /// Running mode: priority on precision
    pub const MODE_HIGH_ACCURACY: i64 = 2;
    /// Running mode: priority on sampling speed
    pub const MODE_HIGH_SPEED: i64 = 3;

    pub async fn find(axon: &Axon, identifier: &str) -> Self {
        Self {
            proxy: axon.find_or_create(Self::CLASS, identifier).await,
        }
    }

    pub async fn first(axon: &Axon) -> Result<Option<Self>, AxonError> {
        match axon.first_hardware_id(Self::CLASS).await? {
            Some(id) => Ok(Some(Self::find(axon, id.as_str()).await)),
            None => Ok(None),
        }
    }

    pub async fn next_range_finder(&self) -> Result<Option<Self>, AxonError> {
        let axon = self.proxy.runtime_handle()?;
        let resolved = self.proxy.resolve().await?;
        match axon
            .next_hardware_id(Self::CLASS, &resolved.hardware_id)
            .await?
        {
            Some(id) => Ok(Some(Self::find(&axon, id.as_str()).await)),
            None => Ok(None),
        }
    }

    pub async fn is_online(&self) -> bool {
        self.proxy.is_online().await
    }

    /// Measured distance, in the configured unit
    pub async fn current_value(&self) -> Result<f64, AxonError> {
        self.proxy.get_float("currentValue").await
    }

    pub async fn unit(&self) -> Result<String, AxonError> {
        self.proxy.get_string("unit").await
    }

    /// Change the measuring unit ("\"" or "mm"); other values are
    /// ignored by the device
    pub async fn set_unit(&self, unit: &str) -> Result<i32, AxonError> {
        self.proxy.set_attr("unit", AttrValue::from(unit)).await
    }

    /// Running mode, one of the `MODE_*` constants
    pub async fn range_finder_mode(&self) -> Result<i64, AxonError> {
        self.proxy.get_int("rangeFinderMode").await
    }

    pub async fn set_range_finder_mode(&self, mode: i64) -> Result<i32, AxonError> {
        self.proxy.set_attr("rangeFinderMode", AttrValue::Int(mode)).await
    }

    /// Recalibrate against the current ambient temperature. The device
    /// performs this on its own at startup; trigger it again when the
    /// temperature delta since the last calibration exceeds 8 degrees.
    pub async fn trigger_temp_calibration(&self) -> Result<i32, AxonError> {
        self.proxy.set_attr("command", AttrValue::from("T")).await
    }

    pub fn proxy(&self) -> &Arc<FunctionProxy> {
        &self.proxy
    }
}

/// Electrical power meter
#[derive(Clone)]
pub struct PowerMeter {
    proxy: Arc<FunctionProxy>,
}

impl PowerMeter {
    pub const CLASS: &'static str = "PowerMeter";

    pub async fn find(axon: &Axon, identifier: &str) -> Self {
        Self {
            proxy: axon.find_or_create(Self::CLASS, identifier).await,
        }
    }

    pub async fn first(axon: &Axon) -> Result<Option<Self>, AxonError> {
        match axon.first_hardware_id(Self::CLASS).await? {
            Some(id) => Ok(Some(Self::find(axon, id.as_str()).await)),
            None => Ok(None),
        }
    }

    pub async fn next_meter(&self) -> Result<Option<Self>, AxonError> {
        let axon = self.proxy.runtime_handle()?;
        let resolved = self.proxy.resolve().await?;
        match axon
            .next_hardware_id(Self::CLASS, &resolved.hardware_id)
            .await?
        {
            Some(id) => Ok(Some(Self::find(&axon, id.as_str()).await)),
            None => Ok(None),
        }
    }

    pub async fn is_online(&self) -> bool {
        self.proxy.is_online().await
    }

    /// Instantaneous power, in watts
    pub async fn current_value(&self) -> Result<f64, AxonError> {
        self.proxy.get_float("currentValue").await
    }

    /// Power factor of the load
    pub async fn cos_phi(&self) -> Result<f64, AxonError> {
        self.proxy.get_float("cosPhi").await
    }

    /// Energy counter since the last device reset, in watt-hours
    pub async fn meter(&self) -> Result<f64, AxonError> {
        self.proxy.get_float("meter").await
    }

    pub fn proxy(&self) -> &Arc<FunctionProxy> {
        &self.proxy
    }
}
