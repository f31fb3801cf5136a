//! In-crate recording socket for unit tests.

use std::io;

use sonic_mroute_types::{Interface, SlotIndex};

use crate::family::Family;
use crate::kernel::KernelSocket;
use crate::route::Mroute;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call<F: Family> {
    Add(Mroute<F>),
    Del(Mroute<F>),
}

#[derive(Debug)]
pub struct RecordingSocket<F: Family> {
    pub calls: Vec<Call<F>>,
    pub fail_add: Option<i32>,
    pub fail_del: Option<i32>,
}

impl<F: Family> Default for RecordingSocket<F> {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            fail_add: None,
            fail_del: None,
        }
    }
}

impl<F: Family> RecordingSocket<F> {
    pub fn adds(&self) -> Vec<&Mroute<F>> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Add(r) => Some(r),
                Call::Del(_) => None,
            })
            .collect()
    }

    pub fn dels(&self) -> Vec<&Mroute<F>> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Del(r) => Some(r),
                Call::Add(_) => None,
            })
            .collect()
    }
}

impl<F: Family> KernelSocket<F> for RecordingSocket<F> {
    fn init(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn done(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn add_interface(&mut self, _slot: SlotIndex, _iface: &Interface) -> io::Result<()> {
        Ok(())
    }

    fn add_route(&mut self, route: &Mroute<F>) -> io::Result<()> {
        self.calls.push(Call::Add(route.clone()));
        match self.fail_add {
            Some(errno) => Err(io::Error::from_raw_os_error(errno)),
            None => Ok(()),
        }
    }

    fn del_route(&mut self, route: &Mroute<F>) -> io::Result<()> {
        self.calls.push(Call::Del(route.clone()));
        match self.fail_del {
            Some(errno) => Err(io::Error::from_raw_os_error(errno)),
            None => Ok(()),
        }
    }
}
