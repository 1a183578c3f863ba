/// Oversampling settings for temperature, pressure and humidity.
///
/// Higher oversampling rates reduce noise by averaging in hardware, at the cost of a longer
/// measurement and more current per cycle. Every sample reports all three channels, so there is
/// no setting that switches a channel off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Oversampling {
    X1 = 1,
    X2 = 2,
    X4 = 3,
    X8 = 4,
    /// Maximum precision, longest duration.
    X16 = 5,
}

impl Oversampling {
    /// Decodes a 3-bit `osrs_x` register field. Reserved codes (6, 7) mean x16 on the device;
    /// `0` (channel skipped) yields `None`.
    pub fn from_bits(value: u8) -> Option<Self> {
        match value & 0b111 {
            0 => None,
            1 => Some(Oversampling::X1),
            2 => Some(Oversampling::X2),
            3 => Some(Oversampling::X4),
            4 => Some(Oversampling::X8),
            _ => Some(Oversampling::X16),
        }
    }

    /// Register code of this setting.
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Number of internal conversions averaged into one result.
    pub fn cycles(self) -> u32 {
        match self {
            Oversampling::X1 => 1,
            Oversampling::X2 => 2,
            Oversampling::X4 => 4,
            Oversampling::X8 => 8,
            Oversampling::X16 => 16,
        }
    }
}

/// Coefficient of the IIR filter applied to temperature and pressure.
///
/// Smooths short disturbances such as a slammed door. Has no effect on humidity.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum IirFilter {
    #[default]
    Off = 0,
    C1 = 1,
    C3 = 2,
    C7 = 3,
    C15 = 4,
    C31 = 5,
    C63 = 6,
    C127 = 7,
}

/// What to do when the pressure formula hits its zero divisor or leaves the representable range.
///
/// The reference algorithm returns `0` for the zero divisor. A reading of 0 hPa is physically
/// meaningless, so the driver either reports it flagged ([`CompensatedSample::pressure_degenerate`])
/// or refuses the sample.
///
/// [`CompensatedSample::pressure_degenerate`]: crate::CompensatedSample::pressure_degenerate
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DegeneratePressure {
    /// Report `0` hPa and set `pressure_degenerate` on the sample.
    #[default]
    ReportZero,
    /// Fail the read with [`Bme680Error::DegenerateComputation`](crate::error::Bme680Error).
    Error,
}

/// Complete driver configuration, applied by [`Bme680::initialize`](crate::Bme680::initialize).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub temp_osrs: Oversampling,
    pub pres_osrs: Oversampling,
    pub hum_osrs: Oversampling,
    pub iir_filter: IirFilter,
    /// Wait between two reads of the `measuring` flag.
    pub poll_interval_ms: u32,
    /// Upper bound on status reads per measurement before giving up with a timeout.
    pub max_poll_attempts: u16,
    pub degenerate_pressure: DegeneratePressure,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            temp_osrs: Oversampling::X2,
            pres_osrs: Oversampling::X16,
            hum_osrs: Oversampling::X1,
            iir_filter: IirFilter::Off,
            poll_interval_ms: 10,
            max_poll_attempts: 50,
            degenerate_pressure: DegeneratePressure::ReportZero,
        }
    }
}

impl Config {
    /// `ctrl_hum` value: `osrs_h` in bits 2:0, SPI 3-wire interrupt disabled.
    pub(crate) fn ctrl_hum(&self) -> u8 {
        self.hum_osrs.bits()
    }

    /// `ctrl_meas` value with the power mode left in sleep.
    pub(crate) fn ctrl_meas(&self) -> u8 {
        (self.temp_osrs.bits() << 5) | (self.pres_osrs.bits() << 2) | crate::regs::MODE_SLEEP
    }

    /// `config` value: filter coefficient in bits 4:2.
    pub(crate) fn config_reg(&self) -> u8 {
        (self.iir_filter as u8) << 2
    }

    /// Nominal duration of one forced measurement in milliseconds (datasheet 3.2.1,
    /// without the gas heater phase), rounded up.
    pub fn measurement_duration_ms(&self) -> u32 {
        let cycles =
            self.temp_osrs.cycles() + self.pres_osrs.cycles() + self.hum_osrs.cycles();
        // 1963 us per conversion, 477 us x 4 for TPH switching, 477 us x 5 for gas, 500 us wake-up.
        let micros = cycles * 1963 + 477 * 4 + 477 * 5 + 500;
        micros.div_ceil(1000)
    }
}

/// Fluent builder for [`Config`].
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temp_oversampling(mut self, os: Oversampling) -> Self {
        self.config.temp_osrs = os;
        self
    }

    pub fn pres_oversampling(mut self, os: Oversampling) -> Self {
        self.config.pres_osrs = os;
        self
    }

    pub fn hum_oversampling(mut self, os: Oversampling) -> Self {
        self.config.hum_osrs = os;
        self
    }

    pub fn iir_filter(mut self, filter: IirFilter) -> Self {
        self.config.iir_filter = filter;
        self
    }

    /// Sets the wait between status polls.
    pub fn poll_interval_ms(mut self, interval: u32) -> Self {
        self.config.poll_interval_ms = interval;
        self
    }

    /// Sets the maximum number of status reads per measurement. Clamped to at least 1.
    pub fn max_poll_attempts(mut self, attempts: u16) -> Self {
        self.config.max_poll_attempts = attempts.max(1);
        self
    }

    pub fn degenerate_pressure(mut self, policy: DegeneratePressure) -> Self {
        self.config.degenerate_pressure = policy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
