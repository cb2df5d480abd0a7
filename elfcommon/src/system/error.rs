use error_stack::{report, Report};

/// Error messages
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    // === path operations ===
    #[error("failed to canonicalize `{0}`")]
    Canonicalize(String),

    // === file operations ===
    #[error("failed to read from `{0}`")]
    ReadFile(String),
    #[error("failed to walk directory `{0}`")]
    WalkDirectory(String),

    // === tasks ===
    #[error("worker task was dropped before completing")]
    TaskDropped,
}

/// Marker trait for errors that can be used
/// in the context wrapper system
pub trait Context: error_stack::Context {}

/// Trait for wrapping execution with some context
pub trait ChangeContext: Sized {
    type Target: error_stack::Context;
    fn change_context(report: Report<impl Context>) -> Report<Self::Target>;
}

/// Wrapper for Report so we can implement our own traits
#[repr(transparent)]
pub struct ReportWrapper<CC: ChangeContext>(Report<CC::Target>);

/// A Result type that wraps errors with context
/// automatically when using the `?` operator
pub type ResultIn<T, C> = Result<T, ReportWrapper<C>>;

impl<E: Context, CC: ChangeContext> From<E> for ReportWrapper<CC> {
    #[track_caller]
    fn from(value: E) -> Self {
        Self(CC::change_context(report!(value)))
    }
}

impl<E: Context, CC: ChangeContext> From<Report<E>> for ReportWrapper<CC> {
    #[track_caller]
    fn from(value: Report<E>) -> Self {
        Self(CC::change_context(value))
    }
}

impl<CC: ChangeContext> From<ReportWrapper<CC>> for Report<CC::Target> {
    fn from(value: ReportWrapper<CC>) -> Report<CC::Target> {
        value.0
    }
}

/// Create a type and implement the ChangeContext trait for it
#[macro_export]
macro_rules! error_context {
    ($vis:vis $ty:ident, | $report:ident | -> $target:ty $body:block) => {
        $vis struct $ty;
        impl $crate::system::ChangeContext for $ty {
            type Target = $target;
            #[inline]
            fn change_context(
                $report: error_stack::Report<impl $crate::system::Context>,
            ) -> error_stack::Report<$target> {
                $body
            }
        }
    };
}

/// Unwrap a [`ResultIn`] back into a plain error-stack result
pub trait ResultInExt {
    type Context: error_stack::Context;
    type Ok;

    /// Changes the context of the report inside the result.
    fn change_context<C>(self, context: C) -> Result<Self::Ok, Report<C>>
    where
        C: error_stack::Context;
}

impl<T, C> ResultInExt for ResultIn<T, C>
where
    C: ChangeContext,
{
    type Context = C::Target;
    type Ok = T;

    #[track_caller]
    fn change_context<C2>(self, context: C2) -> Result<T, Report<C2>>
    where
        C2: error_stack::Context,
    {
        match self {
            Ok(ok) => Ok(ok),
            Err(ReportWrapper(report)) => Err(report.change_context(context)),
        }
    }
}

// foreign errors that can be converted with `?` in a `ResultIn` function

impl Context for Error {}
impl Context for std::io::Error {}
impl Context for regex::Error {}
impl Context for toml::de::Error {}
impl Context for serde_json::Error {}
impl Context for walkdir::Error {}
