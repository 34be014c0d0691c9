//! The top-level consensus engine.
//!
//! Accepts client submissions, drives phases through the consensus manager,
//! commits decisions into the state machine, and resynchronizes dormant
//! replicas from their peers. All phase-advancing work runs on the serial
//! critical worker; gossip handling and network sends use the parallel
//! pool.

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use phalanx_core::messages::{
    DecisionMessage, MessagePayload, NewBatchMessage, ProposeMessage, ProtocolMessage,
    VoteRound1Message, VoteRound2Message,
};
use phalanx_core::network::{ClusterConfig, NetworkTransport, QuorumEvent};
use phalanx_core::persistence::{Persistence, SavedState};
use phalanx_core::state_machine::StateMachine;
use phalanx_core::{
    Command, CommandBatch, CorrelationId, NodeId, PhalanxError, Phase, Result, StateValue,
    Validator,
};

use crate::config::EngineConfig;
use crate::consensus::ConsensusManager;
use crate::executor::{CriticalTask, Executor};
use crate::pending::PendingPool;
use crate::phase::Round2Outcome;
use crate::state::StateManager;

/// A point-in-time view of the engine's internals.
#[derive(Debug, Clone)]
pub struct EngineStatistics {
    pub current_phase: Phase,
    pub last_committed_phase: Phase,
    pub pending_batches: usize,
    pub cached_phases: usize,
    pub in_flight_clients: usize,
    pub is_active: bool,
    pub is_in_phase: bool,
}

type ClientCompletion = oneshot::Sender<Result<Vec<Bytes>>>;

struct EngineInner<SM, NT, PL> {
    config: EngineConfig,
    cluster: ClusterConfig,
    consensus: ConsensusManager,
    state: StateManager<SM, PL>,
    network: NT,
    executor: Executor,
    pool: Mutex<PendingPool>,
    /// The batch this replica popped for its current proposal, if any.
    proposed: Mutex<Option<CommandBatch>>,
    /// Locked value carried out of a phase that did not decide.
    carry: Mutex<Option<(StateValue, Option<CommandBatch>)>>,
    clients: DashMap<CorrelationId, ClientCompletion>,
    shutdown: watch::Sender<bool>,
}

pub struct ConsensusEngine<SM, NT, PL> {
    inner: Arc<EngineInner<SM, NT, PL>>,
    critical: Mutex<Option<JoinHandle<()>>>,
    critical_rx: Mutex<Option<mpsc::Receiver<CriticalTask>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<SM, NT, PL> ConsensusEngine<SM, NT, PL>
where
    SM: StateMachine + 'static,
    NT: NetworkTransport,
    PL: Persistence,
{
    pub fn new(
        cluster: ClusterConfig,
        config: EngineConfig,
        state_machine: SM,
        network: NT,
        persistence: PL,
    ) -> Self {
        let (executor, critical_rx) = Executor::new(config.critical_queue_depth);
        let consensus = ConsensusManager::new(
            cluster.node_id().clone(),
            cluster.quorum_size(),
            cluster.f_plus_one(),
            config.max_phases_cache,
        );
        let state = StateManager::new(state_machine, persistence);
        let pool = Mutex::new(PendingPool::new(config.max_pending_batches));
        let (shutdown, _) = watch::channel(false);

        Self {
            inner: Arc::new(EngineInner {
                config,
                cluster,
                consensus,
                state,
                network,
                executor,
                pool,
                proposed: Mutex::new(None),
                carry: Mutex::new(None),
                clients: DashMap::new(),
                shutdown,
            }),
            critical: Mutex::new(None),
            critical_rx: Mutex::new(Some(critical_rx)),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn node_id(&self) -> &NodeId {
        self.inner.cluster.node_id()
    }

    /// Spawn the critical worker, the inbound dispatcher, and the periodic
    /// cleanup loop. The engine stays dormant until resynchronization
    /// completes; await [`wait_started`](Self::wait_started) for readiness.
    pub fn start(&self) {
        let Some(rx) = self.critical_rx.lock().take() else {
            warn!("engine already started");
            return;
        };
        info!("starting consensus engine for node {}", self.node_id());
        *self.critical.lock() = Some(tokio::spawn(EngineInner::critical_loop(
            self.inner.clone(),
            rx,
        )));
        let mut tasks = self.tasks.lock();
        tasks.push(tokio::spawn(EngineInner::dispatch_loop(self.inner.clone())));
        tasks.push(tokio::spawn(EngineInner::cleanup_loop(self.inner.clone())));
    }

    /// Resolves once this replica has activated.
    pub async fn wait_started(&self) {
        self.inner.state.wait_started().await;
    }

    /// Feed a quorum state change from the membership layer.
    pub fn notify_quorum(&self, event: QuorumEvent) {
        if let Err(e) = self.inner.executor.submit(CriticalTask::QuorumChanged(event)) {
            self.inner.fatal_shutdown(&e);
        }
    }

    /// Submit a batch of commands for replication. Resolves with the
    /// per-command results once the batch commits on this replica.
    pub async fn apply(&self, commands: Vec<Command>) -> Result<Vec<Bytes>> {
        if commands.is_empty() {
            return Err(PhalanxError::EmptyCommandBatch);
        }
        if !self.inner.state.is_active() {
            return Err(PhalanxError::NodeInactive);
        }
        if self.inner.clients.len() >= self.inner.config.max_correlation_map {
            return Err(PhalanxError::internal("client correlation map is full"));
        }

        let batch = CommandBatch::new(commands);
        let correlation_id = batch.correlation_id;
        if !self.inner.pool.lock().insert(batch.clone()) {
            return Err(PhalanxError::internal("pending batch pool is full"));
        }

        let (tx, rx) = oneshot::channel();
        self.inner.clients.insert(correlation_id, tx);
        // Re-check after the insert: a shutdown that raced the gate above
        // has already swept the completion map, so a late entry would wait
        // on a sender nobody will ever resolve.
        if !self.inner.state.is_active() {
            self.inner.clients.remove(&correlation_id);
            return Err(PhalanxError::NodeInactive);
        }

        // Gossip the batch before starting a phase for it, so peers hold it
        // in their pools by the time our proposal arrives.
        if let Err(e) = self
            .inner
            .network
            .broadcast(ProtocolMessage::new_batch(self.node_id().clone(), batch))
            .await
        {
            warn!("batch gossip failed: {e}");
        }
        if !self.inner.state.is_in_phase() {
            if let Err(e) = self.inner.executor.submit(CriticalTask::StartPhase) {
                self.inner.fatal_shutdown(&e);
                return Err(e);
            }
        }

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(PhalanxError::NodeInactive),
        }
    }

    /// Stop the engine: refuse new work, drain the critical worker within
    /// the configured timeout, cancel the background loops, and fail
    /// outstanding clients.
    pub async fn stop(&self) {
        info!("stopping consensus engine for node {}", self.node_id());
        // Flip to inactive before tearing anything down, so `apply` stops
        // admitting work while the drain runs.
        self.inner.state.halt();
        self.inner.fail_outstanding_clients();
        let _ = self.inner.executor.submit(CriticalTask::Stop);

        let handle = self.critical.lock().take();
        if let Some(mut handle) = handle {
            if tokio::time::timeout(self.inner.config.shutdown_timeout, &mut handle)
                .await
                .is_err()
            {
                warn!("critical worker did not drain in time, aborting it");
                handle.abort();
            }
        }
        self.inner.shutdown.send_replace(true);
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        // A submission that raced the halt above may have registered its
        // completion after the first sweep; fail it too.
        self.inner.fail_outstanding_clients();
    }

    pub fn statistics(&self) -> EngineStatistics {
        EngineStatistics {
            current_phase: self.inner.state.current_phase(),
            last_committed_phase: self.inner.state.last_committed_phase(),
            pending_batches: self.inner.pool.lock().len(),
            cached_phases: self.inner.consensus.cached_phases(),
            in_flight_clients: self.inner.clients.len(),
            is_active: self.inner.state.is_active(),
            is_in_phase: self.inner.state.is_in_phase(),
        }
    }
}

impl<SM, NT, PL> EngineInner<SM, NT, PL>
where
    SM: StateMachine + 'static,
    NT: NetworkTransport,
    PL: Persistence,
{
    fn node_id(&self) -> &NodeId {
        self.cluster.node_id()
    }

    // ---- worker loops -----------------------------------------------------

    async fn critical_loop(inner: Arc<Self>, mut rx: mpsc::Receiver<CriticalTask>) {
        let mut shutdown = inner.shutdown.subscribe();
        loop {
            // The shutdown watch is the backstop for a fatal failure
            // elsewhere: without it a full queue would leave this worker
            // parked on recv forever.
            let task = tokio::select! {
                task = rx.recv() => task,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            };
            let Some(task) = task else { break };
            match task {
                CriticalTask::Stop => break,
                CriticalTask::StartPhase => inner.start_phase(),
                CriticalTask::QuorumChanged(event) => inner.on_quorum_changed(event).await,
                CriticalTask::Inbound { from, message } => {
                    if let Err(e) = inner.handle_critical(from, message).await {
                        inner.fatal_shutdown(&e);
                        break;
                    }
                }
            }
        }
        debug!("critical worker stopped");
    }

    async fn dispatch_loop(inner: Arc<Self>) {
        let mut shutdown = inner.shutdown.subscribe();
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                received = inner.network.receive() => {
                    match received {
                        Ok((from, message)) => inner.route(from, message),
                        Err(e) => {
                            debug!("transport receive loop ended: {e}");
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn cleanup_loop(inner: Arc<Self>) {
        let mut shutdown = inner.shutdown.subscribe();
        let mut ticker = tokio::time::interval(inner.config.cleanup_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = inner.consensus.remove_older_than(
                        inner.state.current_phase(),
                        inner.config.remove_older_than_phases,
                    );
                    if removed > 0 {
                        debug!("dropped {removed} aged phase entries");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    /// Periodic sync requests while dormant, jittered to avoid the whole
    /// cluster asking in lockstep.
    async fn sync_request_loop(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();
        loop {
            if self.state.is_active() || *shutdown.borrow() {
                break;
            }
            if let Err(e) = self
                .network
                .broadcast(ProtocolMessage::sync_request(self.node_id().clone()))
                .await
            {
                warn!("sync request broadcast failed: {e}");
            }
            let jitter = 0.5 + rand::random::<f64>() * 0.5;
            let delay = self.config.sync_retry_interval.mul_f64(jitter);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {}
            }
        }
        debug!("sync retry loop finished");
    }

    // ---- message routing --------------------------------------------------

    fn route(self: &Arc<Self>, from: NodeId, message: ProtocolMessage) {
        if let Err(e) = message.validate() {
            warn!("dropping invalid message from {from}: {e}");
            return;
        }
        if message.from != from {
            warn!(
                "message claims sender {} but was delivered by {from}",
                message.from
            );
            return;
        }
        match message.payload {
            // Fast-path gossip is handled right here on the dispatcher
            // task, keeping it off the critical worker while preserving
            // per-sender arrival order.
            MessagePayload::Propose(msg) => self.on_propose(from, msg),
            MessagePayload::NewBatch(msg) => self.on_new_batch(from, msg),
            _ => {
                if let Err(e) = self
                    .executor
                    .submit(CriticalTask::Inbound { from, message })
                {
                    self.fatal_shutdown(&e);
                }
            }
        }
    }

    async fn handle_critical(
        self: &Arc<Self>,
        from: NodeId,
        message: ProtocolMessage,
    ) -> Result<()> {
        match message.payload {
            MessagePayload::VoteRound1(msg) => {
                self.on_round1_vote(from, msg);
                Ok(())
            }
            MessagePayload::VoteRound2(msg) => self.on_round2_vote(from, msg).await,
            MessagePayload::Decision(msg) => self.on_decision(msg).await,
            MessagePayload::SyncRequest => {
                self.on_sync_request(from).await;
                Ok(())
            }
            MessagePayload::SyncResponse(msg) => {
                self.on_sync_response(from, msg.saved).await;
                Ok(())
            }
            // Fast-path payloads can legitimately arrive here through the
            // local loopback; handle them in place.
            MessagePayload::Propose(msg) => {
                self.on_propose(from, msg);
                Ok(())
            }
            MessagePayload::NewBatch(msg) => {
                self.on_new_batch(from, msg);
                Ok(())
            }
        }
    }

    // ---- sending ----------------------------------------------------------

    /// Network sends never block the caller; they are handed to the
    /// parallel pool and failures are logged, not propagated.
    fn broadcast(self: &Arc<Self>, message: ProtocolMessage) {
        let inner = self.clone();
        Executor::spawn_parallel(async move {
            if let Err(e) = inner.network.broadcast(message).await {
                warn!("broadcast failed: {e}");
            }
        });
    }

    fn send_unicast(self: &Arc<Self>, target: NodeId, message: ProtocolMessage) {
        let inner = self.clone();
        Executor::spawn_parallel(async move {
            if let Err(e) = inner.network.send_to(&target, message).await {
                warn!("unicast to {target} failed: {e}");
            }
        });
    }

    /// Broadcast does not self-deliver, so locally produced sync-class
    /// messages are fed back through the critical queue as if received.
    fn loopback(&self, message: ProtocolMessage) {
        if let Err(e) = self.executor.submit(CriticalTask::Inbound {
            from: self.node_id().clone(),
            message,
        }) {
            self.fatal_shutdown(&e);
        }
    }

    // ---- phase lifecycle --------------------------------------------------

    /// Proactive phase start from the critical worker. A no-op while
    /// dormant, already in a phase, or with nothing to propose.
    fn start_phase(self: &Arc<Self>) {
        if !self.state.is_active() || self.state.is_in_phase() {
            return;
        }
        let has_work = self.carry.lock().is_some() || !self.pool.lock().is_empty();
        if !has_work {
            return;
        }
        if !self.state.enter_phase() {
            return;
        }
        let phase = self.state.current_phase();
        self.propose_now(phase);
    }

    /// Choose and broadcast this replica's proposal for `phase`. The caller
    /// has already flipped the in-phase flag. A carried lock takes
    /// priority over the pending queue; with neither, the canonical empty
    /// batch keeps the phase moving.
    fn propose_now(self: &Arc<Self>, phase: Phase) {
        let batch = {
            let carried = self.carry.lock().take();
            match carried {
                Some((StateValue::V1, Some(batch))) => batch,
                Some((StateValue::V0, _)) => CommandBatch::empty(),
                _ => match self.pool.lock().pop_next() {
                    Some(batch) => {
                        *self.proposed.lock() = Some(batch.clone());
                        batch
                    }
                    None => CommandBatch::empty(),
                },
            }
        };
        debug!("proposing batch {} in phase {phase}", batch.id);
        self.consensus.register_own_proposal(phase, batch.clone());
        self.broadcast(ProtocolMessage::propose(
            self.node_id().clone(),
            phase,
            batch,
        ));
    }

    // ---- inbound handlers -------------------------------------------------

    fn on_propose(self: &Arc<Self>, from: NodeId, msg: ProposeMessage) {
        if !self.state.is_active() {
            trace!("dormant, ignoring proposal from {from}");
            return;
        }
        let current = self.state.current_phase();
        // Entering the phase on another replica's proposal: contribute our
        // own so the proposal quorum can form.
        if msg.phase == current && self.state.enter_phase() {
            self.propose_now(current);
        }
        let vote = self.consensus.process_proposal(
            &from,
            msg.phase,
            msg.batch,
            current,
            self.state.is_in_phase(),
        );
        if let Some(value) = vote {
            let message = ProtocolMessage::vote_round1(self.node_id().clone(), msg.phase, value);
            self.broadcast(message.clone());
            self.loopback(message);
        }
    }

    fn on_new_batch(self: &Arc<Self>, from: NodeId, msg: NewBatchMessage) {
        if !self.pool.lock().insert(msg.batch) {
            debug!("ignoring batch gossip from {from}: duplicate or pool full");
            return;
        }
        if self.state.is_active() && !self.state.is_in_phase() {
            if let Err(e) = self.executor.submit(CriticalTask::StartPhase) {
                self.fatal_shutdown(&e);
            }
        }
    }

    fn on_round1_vote(self: &Arc<Self>, from: NodeId, msg: VoteRound1Message) {
        if !self.state.is_active() {
            return;
        }
        let vote = self.consensus.process_round1_vote(
            &from,
            msg.phase,
            msg.value,
            self.state.current_phase(),
            self.state.is_in_phase(),
        );
        if let Some(value) = vote {
            let message = ProtocolMessage::vote_round2(self.node_id().clone(), msg.phase, value);
            self.broadcast(message.clone());
            self.loopback(message);
        }
    }

    async fn on_round2_vote(self: &Arc<Self>, from: NodeId, msg: VoteRound2Message) -> Result<()> {
        if !self.state.is_active() {
            return Ok(());
        }
        let outcome = self.consensus.process_round2_vote(
            &from,
            msg.phase,
            msg.value,
            self.state.current_phase(),
            self.state.is_in_phase(),
        );
        match outcome {
            Some(Round2Outcome::Decide { value, batch }) => {
                info!("phase {} resolved with {value}", msg.phase);
                self.broadcast(ProtocolMessage::decision(
                    self.node_id().clone(),
                    msg.phase,
                    value,
                    batch.clone(),
                ));
                // Deliver locally through the same path as a network arrival.
                self.on_decision(DecisionMessage {
                    phase: msg.phase,
                    value,
                    batch,
                })
                .await
            }
            Some(Round2Outcome::CarryForward { locked, batch }) => {
                debug!(
                    "phase {} carries {locked} forward without deciding",
                    msg.phase
                );
                if let Some(own) = self.proposed.lock().take() {
                    self.pool.lock().insert(own);
                }
                *self.carry.lock() = Some((locked, batch));
                self.state.move_to_next_phase(msg.phase);
                self.start_phase();
                Ok(())
            }
            None => Ok(()),
        }
    }

    async fn on_decision(self: &Arc<Self>, msg: DecisionMessage) -> Result<()> {
        if !self.state.is_active() {
            return Ok(());
        }
        if msg.phase < self.state.current_phase() {
            trace!("dropping stale decision for phase {}", msg.phase);
            return Ok(());
        }
        if !self.consensus.should_commit_decision(msg.phase) {
            return Ok(());
        }

        if msg.value == StateValue::V1 && !msg.batch.is_empty() {
            let results = self.state.commit_changes(&msg.batch, msg.phase).await?;
            info!(
                "committed batch {} ({} commands) in phase {}",
                msg.batch.id,
                msg.batch.commands.len(),
                msg.phase
            );
            if let Some((_, tx)) = self.clients.remove(&msg.batch.correlation_id) {
                let _ = tx.send(Ok(results));
            }
            self.pool.lock().remove(&msg.batch.correlation_id);
        } else {
            debug!("phase {} committed the empty batch", msg.phase);
        }

        // Whatever we had popped for this phase either just committed or
        // goes back into the pool for a later phase.
        if let Some(own) = self.proposed.lock().take() {
            if own.correlation_id != msg.batch.correlation_id {
                self.pool.lock().insert(own);
            }
        }

        self.state.move_to_next_phase(msg.phase);
        if self.carry.lock().is_some() || !self.pool.lock().is_empty() {
            if let Err(e) = self.executor.submit(CriticalTask::StartPhase) {
                self.fatal_shutdown(&e);
            }
        }
        Ok(())
    }

    async fn on_sync_request(self: &Arc<Self>, from: NodeId) {
        let pending = self.pool.lock().batches();
        let saved = self.state.create_sync_response(pending).await;
        debug!(
            "answering sync request from {from} at committed phase {}",
            saved.last_committed_phase
        );
        let message = ProtocolMessage::sync_response(self.node_id().clone(), from.clone(), saved);
        self.send_unicast(from, message);
    }

    async fn on_sync_response(self: &Arc<Self>, from: NodeId, saved: SavedState) {
        if self.state.is_active() {
            return;
        }
        let responses = self.state.record_sync_response(from, saved);
        if responses < self.cluster.quorum_size() {
            return;
        }
        let Some(best) = self.state.select_best_sync_response() else {
            return;
        };
        match self.state.restore_state(best).await {
            Ok(pending) => {
                {
                    let mut pool = self.pool.lock();
                    for batch in pending {
                        pool.insert(batch);
                    }
                }
                self.state.activate();
                info!("resynchronized up to phase {}", self.state.current_phase());
                if !self.pool.lock().is_empty() {
                    if let Err(e) = self.executor.submit(CriticalTask::StartPhase) {
                        self.fatal_shutdown(&e);
                    }
                }
            }
            Err(e) => {
                // Stay dormant; the retry loop keeps requesting.
                warn!("restore failed, remaining dormant: {e}");
                self.state.clear_sync_responses();
            }
        }
    }

    async fn on_quorum_changed(self: &Arc<Self>, event: QuorumEvent) {
        match event {
            QuorumEvent::Established => {
                if self.state.is_active() {
                    return;
                }
                info!("quorum established, resynchronizing");
                Executor::spawn_parallel(self.clone().sync_request_loop());
            }
            QuorumEvent::Disappeared => {
                warn!("quorum lost, deactivating");
                let mut pending = self.pool.lock().drain();
                if let Some(own) = self.proposed.lock().take() {
                    pending.push(own);
                }
                if let Some((_, Some(batch))) = self.carry.lock().take() {
                    pending.push(batch);
                }
                self.state.deactivate(pending).await;
                self.consensus.clear();
            }
        }
    }

    /// Unrecoverable failure (critical queue exhausted or the state
    /// machine rejecting a commit): stop accepting work, resolve every
    /// waiting client with an error, and signal all workers to terminate.
    fn fatal_shutdown(&self, error: &PhalanxError) {
        error!("unrecoverable consensus failure, halting engine: {error}");
        self.state.halt();
        self.fail_outstanding_clients();
        self.shutdown.send_replace(true);
    }

    fn fail_outstanding_clients(&self) {
        let correlations: Vec<CorrelationId> =
            self.clients.iter().map(|entry| *entry.key()).collect();
        for correlation_id in correlations {
            if let Some((_, tx)) = self.clients.remove(&correlation_id) {
                let _ = tx.send(Err(PhalanxError::NodeInactive));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phalanx_core::state_machine::InMemoryStateMachine;
    use phalanx_persistence::InMemoryPersistence;

    /// A transport that never delivers anything; enough for exercising the
    /// submission guards.
    struct NullNetwork;

    #[async_trait::async_trait]
    impl NetworkTransport for NullNetwork {
        async fn broadcast(&self, _message: ProtocolMessage) -> Result<()> {
            Ok(())
        }

        async fn send_to(&self, _target: &NodeId, _message: ProtocolMessage) -> Result<()> {
            Ok(())
        }

        async fn receive(&self) -> Result<(NodeId, ProtocolMessage)> {
            std::future::pending().await
        }
    }

    fn engine() -> ConsensusEngine<InMemoryStateMachine, NullNetwork, InMemoryPersistence> {
        let members = ["a", "b", "c"].map(NodeId::new);
        let cluster = ClusterConfig::new(NodeId::new("a"), members);
        ConsensusEngine::new(
            cluster,
            EngineConfig::testing(),
            InMemoryStateMachine::new(),
            NullNetwork,
            InMemoryPersistence::new(),
        )
    }

    #[tokio::test]
    async fn apply_rejects_an_empty_batch() {
        let engine = engine();
        let err = engine.apply(Vec::new()).await.unwrap_err();
        assert!(matches!(err, PhalanxError::EmptyCommandBatch));
    }

    #[tokio::test]
    async fn apply_rejects_a_dormant_node() {
        let engine = engine();
        let err = engine
            .apply(vec![Command::new("SET k v")])
            .await
            .unwrap_err();
        assert!(matches!(err, PhalanxError::NodeInactive));
    }

    #[tokio::test]
    async fn statistics_reflect_the_initial_state() {
        let engine = engine();
        let stats = engine.statistics();
        assert_eq!(stats.current_phase, Phase::ZERO);
        assert_eq!(stats.pending_batches, 0);
        assert!(!stats.is_active);
        assert!(!stats.is_in_phase);
    }

    #[tokio::test]
    async fn stop_is_safe_before_start() {
        let engine = engine();
        engine.stop().await;
        assert!(!engine.statistics().is_active);
    }
}
