//! Calling a plain function with a list of decoded, type-erased values.
//!
//! [`Handler`] is implemented for every `Fn` of up to 16 parameters. It
//! reports its parameter and output types at runtime so the binder can
//! validate them the same way it validates a declaration it has parsed.

use crate::error::{BoxError, CallFault, Error};
use crate::flag::FlagValue;
use std::any::{type_name, Any, TypeId};
use std::fmt;

/// Runtime descriptor of a parameter or return type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamType {
    id: TypeId,
    name: &'static str,
}

impl ParamType {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl fmt::Debug for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A function callable with values decoded from flags.
pub trait Handler<Args>: Send + Sync + 'static {
    fn params(&self) -> Vec<ParamType>;

    fn output(&self) -> ParamType;

    /// Call with exactly one value per parameter, in declaration order.
    fn call(&self, args: Vec<FlagValue>) -> Result<Box<dyn Any>, CallFault>;
}

fn take<T: 'static>(
    args: &mut impl Iterator<Item = FlagValue>,
    position: usize,
) -> Result<T, CallFault> {
    let value = args.next().ok_or(CallFault::MissingArgument(position))?;
    value
        .downcast::<T>()
        .map(|v| *v)
        .map_err(|_| CallFault::ArgumentType {
            position,
            expected: type_name::<T>(),
        })
}

macro_rules! impl_handler {
    ($($arg:ident),*) => {
        impl<Func, Out, $($arg,)*> Handler<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Out + Send + Sync + 'static,
            Out: 'static,
            $($arg: 'static,)*
        {
            fn params(&self) -> Vec<ParamType> {
                vec![$(ParamType::of::<$arg>()),*]
            }

            fn output(&self) -> ParamType {
                ParamType::of::<Out>()
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn call(&self, args: Vec<FlagValue>) -> Result<Box<dyn Any>, CallFault> {
                let mut args = args.into_iter();
                let mut position = 0;
                $(
                    position += 1;
                    let $arg = take::<$arg>(&mut args, position)?;
                )*
                Ok(Box::new((self)($($arg),*)))
            }
        }
    };
}

impl_handler!();
impl_handler!(A1);
impl_handler!(A1, A2);
impl_handler!(A1, A2, A3);
impl_handler!(A1, A2, A3, A4);
impl_handler!(A1, A2, A3, A4, A5);
impl_handler!(A1, A2, A3, A4, A5, A6);
impl_handler!(A1, A2, A3, A4, A5, A6, A7);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11, A12);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11, A12, A13);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11, A12, A13, A14);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11, A12, A13, A14, A15);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11, A12, A13, A14, A15, A16);

// ── Return shapes ────────────────────────────────────────────────

/// Accepted return types: nothing, or a unit result carrying an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    Unit,
    Anyhow,
    Boxed,
    Crate,
}

impl ReturnShape {
    pub fn of(ty: ParamType) -> Option<Self> {
        if ty.is::<()>() {
            Some(ReturnShape::Unit)
        } else if ty.is::<anyhow::Result<()>>() {
            Some(ReturnShape::Anyhow)
        } else if ty.is::<Result<(), BoxError>>() {
            Some(ReturnShape::Boxed)
        } else if ty.is::<Result<(), Error>>() {
            Some(ReturnShape::Crate)
        } else {
            None
        }
    }

    /// Turn a returned value into the function's own error, if any.
    pub fn settle(
        self,
        value: Box<dyn Any>,
        output: ParamType,
    ) -> Result<Result<(), anyhow::Error>, CallFault> {
        let unexpected = |_| CallFault::UnexpectedReturn(output.name());
        match self {
            ReturnShape::Unit => value.downcast::<()>().map(|_| Ok(())).map_err(unexpected),
            ReturnShape::Anyhow => value
                .downcast::<anyhow::Result<()>>()
                .map(|r| *r)
                .map_err(unexpected),
            ReturnShape::Boxed => value
                .downcast::<Result<(), BoxError>>()
                .map(|r| (*r).map_err(|e| anyhow::anyhow!(e)))
                .map_err(unexpected),
            ReturnShape::Crate => value
                .downcast::<Result<(), Error>>()
                .map(|r| (*r).map_err(anyhow::Error::from))
                .map_err(unexpected),
        }
    }
}
