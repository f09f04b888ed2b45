use derive_more::{Display, Error};
use shelf_catalog::models::PoolId;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not read or write the catalog database")]
    Cache,
    #[display("catalog operation failed")]
    Catalog,
    #[display("no license pool {_0}")]
    UnknownPool(#[error(not(source))] PoolId),
}
