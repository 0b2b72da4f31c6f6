use core::fmt::{Debug, Formatter, Result as FmtResult};

use derive_more::{Deref, DerefMut};

use crate::error::ReadError;

/// A `List[T, N]` that cannot hold more than `N` elements.
///
/// The limit is enforced when the list is constructed. The elements are stored in a boxed slice,
/// so mutable access through `DerefMut` cannot change the length.
#[derive(Clone, PartialEq, Eq, Hash, Deref, DerefMut)]
pub struct ContiguousList<T, const N: usize> {
    elements: Box<[T]>,
}

impl<T, const N: usize> Default for ContiguousList<T, N> {
    fn default() -> Self {
        Self::new_unchecked(Box::default())
    }
}

impl<T: Debug, const N: usize> Debug for ContiguousList<T, N> {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        self.elements.fmt(formatter)
    }
}

impl<T, const N: usize> AsRef<[T]> for ContiguousList<T, N> {
    fn as_ref(&self) -> &[T] {
        self.elements.as_ref()
    }
}

impl<T, const N: usize> TryFrom<Vec<T>> for ContiguousList<T, N> {
    type Error = ReadError;

    fn try_from(vec: Vec<T>) -> Result<Self, Self::Error> {
        Self::validate_length(vec.len())?;
        Ok(Self::new_unchecked(vec.into_boxed_slice()))
    }
}

impl<T, const N: usize, const SIZE: usize> TryFrom<[T; SIZE]> for ContiguousList<T, N> {
    type Error = ReadError;

    fn try_from(array: [T; SIZE]) -> Result<Self, Self::Error> {
        Self::try_from_iter(array)
    }
}

impl<T, const N: usize> From<ContiguousList<T, N>> for Vec<T> {
    fn from(list: ContiguousList<T, N>) -> Self {
        list.elements.into_vec()
    }
}

impl<T, const N: usize> IntoIterator for ContiguousList<T, N> {
    type Item = T;
    type IntoIter = <Vec<T> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_vec().into_iter()
    }
}

impl<'list, T, const N: usize> IntoIterator for &'list ContiguousList<T, N> {
    type Item = &'list T;
    type IntoIter = <&'list [T] as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, const N: usize> ContiguousList<T, N> {
    pub fn try_from_iter(elements: impl IntoIterator<Item = T>) -> Result<Self, ReadError> {
        let elements = elements.into_iter().collect::<Box<[T]>>();
        Self::validate_length(elements.len())?;
        Ok(Self::new_unchecked(elements))
    }

    #[must_use]
    pub fn full(element: T) -> Self
    where
        T: Clone,
    {
        Self::new_unchecked(vec![element; N].into_boxed_slice())
    }

    const fn validate_length(actual: usize) -> Result<(), ReadError> {
        let maximum = N;

        if actual > maximum {
            return Err(ReadError::ListTooLong { maximum, actual });
        }

        Ok(())
    }

    fn new_unchecked(elements: Box<[T]>) -> Self {
        Self { elements }
    }
}
