//! Running planned legs and remote listings on a [`JobRunner`](crate::JobRunner).

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use crate::counter::OpCounter;
use crate::job::{JobCallbacks, JobExit, JobHost, JobId};
use crate::ledger::CacheLedger;
use crate::operation::{Leg, LegReport};
use crate::remote::{ListingSync, apply_listing, parse_lsf_line};
use crate::sync::ListingPlan;
use crate::OpsError;

/// A job host that also owns the cache ledger and hears about finished work.
pub trait LegHost: JobHost {
    fn ledger(&mut self) -> &mut CacheLedger;

    /// Called once per leg, after its last step or its first failure.
    fn leg_finished(&mut self, report: LegReport);

    /// Called when a remote listing has been applied to the cache.
    fn listing_finished(&mut self, dir: PathBuf, result: Result<ListingSync, OpsError>);
}

/// Start the next step of `leg`. Later steps start from the exit handler of
/// the step before, so a leg keeps the counter above zero until it ends.
///
/// A leg with no steps left finishes on the spot and yields `None`.
pub fn launch_leg<H: LegHost + 'static>(
    host: &mut H,
    mut leg: Leg,
    counter: &OpCounter,
) -> Result<Option<JobId>, OpsError> {
    let Some(step) = leg.steps.pop_front() else {
        tracing::debug!(leg = %leg.describe(), "leg finished");
        host.leg_finished(leg.report(None));
        return Ok(None);
    };

    let stderr = Rc::new(RefCell::new(Vec::<String>::new()));
    let sink = Rc::clone(&stderr);
    let next_counter = counter.clone();
    let effect = step.effect;

    let callbacks = JobCallbacks::new()
        .on_error(move |_: &mut H, _, chunk| sink.borrow_mut().push(chunk.to_string()))
        .on_exit(move |host: &mut H, _, exit: JobExit| {
            if !exit.success() {
                let err = OpsError::Transfer {
                    leg: leg.describe(),
                    status: exit.to_string(),
                    message: last_line(&stderr.borrow()),
                };
                tracing::warn!(kind = %leg.kind, error = %err, "leg failed");
                host.leg_finished(leg.report(Some(err.to_string())));
                return;
            }

            if let Some(effect) = &effect {
                host.ledger().apply(effect);
            }
            let fallback = leg.clone();
            if let Err(err) = launch_leg(host, leg, &next_counter) {
                tracing::warn!(error = %err, "could not start next step");
                host.leg_finished(fallback.report(Some(err.to_string())));
            }
        });

    host.runner()
        .start(step.command, false, callbacks, counter)
        .map(Some)
}

/// Run a remote listing and apply its result to the cache mirror.
pub fn launch_listing<H: LegHost + 'static>(
    host: &mut H,
    plan: ListingPlan,
    counter: &OpCounter,
) -> Result<JobId, OpsError> {
    let lines = Rc::new(RefCell::new(Vec::<String>::new()));
    let stderr = Rc::new(RefCell::new(Vec::<String>::new()));
    let out_sink = Rc::clone(&lines);
    let err_sink = Rc::clone(&stderr);
    let ListingPlan { dir, command } = plan;
    let label = command.to_string();

    let callbacks = JobCallbacks::new()
        .on_output(move |_: &mut H, _, chunk| out_sink.borrow_mut().push(chunk.to_string()))
        .on_error(move |_: &mut H, _, chunk| err_sink.borrow_mut().push(chunk.to_string()))
        .on_exit(move |host: &mut H, _, exit: JobExit| {
            let result = if exit.success() {
                let entries: Vec<_> = lines
                    .borrow()
                    .iter()
                    .filter_map(|line| parse_lsf_line(line))
                    .collect();
                apply_listing(&dir, &entries, host.ledger()).map_err(OpsError::from)
            } else {
                Err(OpsError::Transfer {
                    leg: label,
                    status: exit.to_string(),
                    message: last_line(&stderr.borrow()),
                })
            };
            if let Err(err) = &result {
                tracing::warn!(dir = %dir.display(), error = %err, "remote listing failed");
            }
            host.listing_finished(dir, result);
        });

    host.runner().start(command, false, callbacks, counter)
}

fn last_line(lines: &[String]) -> String {
    lines
        .iter()
        .rev()
        .find(|l| !l.trim().is_empty())
        .map(|l| l.trim().to_string())
        .unwrap_or_default()
}
