use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use crate::{
    db_types::OrderNumber,
    traits::{AccrualSource, AccrualSourceError, AccrualVerdict},
};

type ScriptedResponse = Result<AccrualVerdict, AccrualSourceError>;

/// An accrual source that replays a scripted sequence of responses per order.
///
/// Once a script runs out, its final response is repeated for every subsequent call. Orders without a script get
/// [`AccrualSourceError::OrderUnknown`].
#[derive(Clone, Default)]
pub struct ScriptedAccrual {
    inner: Arc<Mutex<HashMap<OrderNumber, Script>>>,
}

#[derive(Default)]
struct Script {
    responses: VecDeque<ScriptedResponse>,
    last: Option<ScriptedResponse>,
    calls: usize,
}

impl ScriptedAccrual {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, number: &OrderNumber, responses: Vec<ScriptedResponse>) {
        let script = Script { responses: responses.into(), last: None, calls: 0 };
        self.inner.lock().unwrap().insert(number.clone(), script);
    }

    /// How many times the authority has been asked about this order.
    pub fn calls_for(&self, number: &OrderNumber) -> usize {
        self.inner.lock().unwrap().get(number).map(|s| s.calls).unwrap_or(0)
    }
}

#[async_trait]
impl AccrualSource for ScriptedAccrual {
    async fn order_status(&self, number: &OrderNumber) -> Result<AccrualVerdict, AccrualSourceError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(script) = inner.get_mut(number) else {
            return Err(AccrualSourceError::OrderUnknown);
        };
        script.calls += 1;
        match script.responses.pop_front() {
            Some(next) => {
                script.last = Some(next.clone());
                next
            },
            None => script.last.clone().unwrap_or(Err(AccrualSourceError::OrderUnknown)),
        }
    }
}
