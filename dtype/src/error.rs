use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Dtype name outside the persisted vocabulary.
    #[snafu(display("unknown dtype name: {name}"))]
    UnknownDType { name: String },

    /// Device type name that no backend recognizes.
    #[snafu(display("unknown device type: {name}"))]
    UnknownDeviceType { name: String },
}
