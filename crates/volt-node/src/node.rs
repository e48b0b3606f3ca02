//! Node operations and remote-message handlers

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info};

use volt_crypto::{public_key_to_address, PrivateKey};
use volt_ledger::{ChannelStatus, LedgerClient};
use volt_net::{MessageHandler, NotifyChannelMsg, PeerMessage, PeerTransport};
use volt_primitives::{Address, Amount};
use volt_types::{ChannelStateMsg, Party, StateError};

use crate::channel::{ChannelPhase, ChannelRecord, Reject};
use crate::config::NodeConfig;
use crate::error::{NodeError, NodeResult};

/// A two-party payment-channel node.
///
/// Owns one record per channel, each behind its own guard, so operations
/// on unrelated channels proceed independently. Ledger transactions are
/// never submitted while a record guard is held; a record's phase flips
/// only once the ledger has acknowledged the corresponding transaction.
pub struct LightningNode {
    key: PrivateKey,
    address: Address,
    config: NodeConfig,
    ledger: Arc<dyn LedgerClient>,
    transport: Arc<dyn PeerTransport>,
    channels: DashMap<Address, Arc<Mutex<ChannelRecord>>>,
}

/// Amount failures surface as `InvalidAmount`; anything else is a crypto fault
fn amount_error(e: StateError) -> NodeError {
    match e {
        StateError::ZeroAmount | StateError::InsufficientBalance { .. } => {
            NodeError::InvalidAmount(e.to_string())
        }
        other => NodeError::State(other),
    }
}

impl LightningNode {
    /// Create a node over the given wallet key, ledger and transport
    pub fn new(
        key: PrivateKey,
        config: NodeConfig,
        ledger: Arc<dyn LedgerClient>,
        transport: Arc<dyn PeerTransport>,
    ) -> Self {
        let address = public_key_to_address(key.verifying_key());
        Self {
            key,
            address,
            config,
            ledger,
            transport,
            channels: DashMap::new(),
        }
    }

    /// This node's ledger account address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Where this node receives peer messages
    pub fn location(&self) -> SocketAddr {
        self.config.location
    }

    /// Channels this node currently tracks.
    ///
    /// Includes closing channels with funds still in them; withdrawn
    /// channels are gone for good.
    pub fn channels(&self) -> Vec<Address> {
        self.channels.iter().map(|entry| *entry.key()).collect()
    }

    /// Latest accepted state of a channel
    pub fn channel_state(&self, channel: Address) -> NodeResult<ChannelStateMsg> {
        let record = self.record(&channel)?;
        let rec = record.lock();
        Ok(rec.latest_state.clone())
    }

    /// Outgoing update the peer has not acknowledged yet, for resend
    /// after a reconnect
    pub fn pending_state(&self, channel: Address) -> NodeResult<Option<ChannelStateMsg>> {
        let record = self.record(&channel)?;
        let rec = record.lock();
        Ok(rec.pending_outgoing.clone())
    }

    fn record(&self, channel: &Address) -> NodeResult<Arc<Mutex<ChannelRecord>>> {
        self.channels
            .get(channel)
            .map(|entry| entry.value().clone())
            .ok_or(NodeError::UnknownChannel)
    }

    /// Open and fund a channel to a peer.
    ///
    /// Deploys the contract with this node as party one and the whole
    /// funding amount on its side, then notifies the peer where to reach
    /// us. Returns the contract address.
    pub fn establish_channel(
        &self,
        peer_address: Address,
        peer_location: SocketAddr,
        amount: Amount,
    ) -> NodeResult<Address> {
        if amount == 0 {
            return Err(NodeError::InvalidAmount("funding must be positive".into()));
        }
        let available = self.ledger.account_balance(self.address)?;
        if amount > available {
            return Err(NodeError::InvalidAmount(format!(
                "funding of {} exceeds account balance {}",
                amount, available
            )));
        }

        let channel = self.ledger.deploy_channel(
            self.address,
            peer_address,
            self.config.appeal_period,
            amount,
        )?;

        let initial = ChannelStateMsg::initial(channel, amount, &self.key)?;
        let record = ChannelRecord::open(channel, Party::One, peer_address, peer_location, initial);
        self.channels.insert(channel, Arc::new(Mutex::new(record)));
        info!("channel {} opened to {} with {}", channel, peer_address, amount);

        self.transport.send(
            peer_location,
            PeerMessage::NotifyChannel(NotifyChannelMsg {
                channel,
                sender_location: self.config.location,
            }),
        );
        Ok(channel)
    }

    /// Move funds to the peer off-chain.
    ///
    /// Builds and signs the next state, parks it in the pending slot and
    /// fires it at the peer. No ledger transaction is involved.
    pub fn send(&self, channel: Address, amount: Amount) -> NodeResult<()> {
        let record = self.record(&channel)?;
        let (peer_location, transfer) = {
            let mut rec = record.lock();
            if rec.phase != ChannelPhase::Open {
                return Err(NodeError::ChannelClosed);
            }
            let next = rec
                .effective_state()
                .transfer(rec.role, amount, &self.key)
                .map_err(amount_error)?;
            rec.pending_outgoing = Some(next.clone());
            (rec.peer_location, next)
        };

        debug!(
            "channel {}: sending {} at serial {}",
            channel, amount, transfer.serial
        );
        // guard released: the transport may deliver (and the ack may come
        // back) on this very thread
        self.transport
            .send(peer_location, PeerMessage::ReceiveFunds(transfer));
        Ok(())
    }

    /// Close the channel on the ledger, starting the appeal window.
    ///
    /// Uses the latest accepted state unless the caller supplies one.
    /// Nothing here stops a caller from trying a stale, self-favoring
    /// state; the contract and the peer's appeal are the safeguard. The
    /// peer is not notified.
    pub fn close_channel(
        &self,
        channel: Address,
        state: Option<ChannelStateMsg>,
    ) -> NodeResult<()> {
        let record = self.record(&channel)?;
        let closing_state = {
            let rec = record.lock();
            if rec.phase != ChannelPhase::Open {
                return Err(NodeError::ChannelClosed);
            }
            state.unwrap_or_else(|| rec.latest_state.clone())
        };

        self.ledger.submit_close(channel, &closing_state)?;
        let deadline = self.ledger.appeal_deadline(channel).ok();

        let mut rec = record.lock();
        rec.phase = ChannelPhase::Closing;
        rec.appeal_deadline = deadline;
        info!(
            "channel {} closing at serial {}, deadline {:?}",
            channel, closing_state.serial, deadline
        );
        Ok(())
    }

    /// Dispute a close recorded with a stale state.
    ///
    /// Submits this node's latest accepted state when it is strictly
    /// newer than the one recorded on-chain; does nothing (successfully)
    /// when the ledger is already current. Failed attempts are not
    /// retried automatically; call again.
    pub fn appeal_closed_channel(&self, channel: Address) -> NodeResult<()> {
        let record = self.record(&channel)?;

        if self.ledger.status(channel)? == ChannelStatus::Open {
            return Err(NodeError::AppealNotNeeded(
                "channel is still open on the ledger".into(),
            ));
        }
        let deadline = self.ledger.appeal_deadline(channel)?;
        if self.ledger.block_number()? >= deadline {
            return Err(NodeError::AppealWindowExpired);
        }

        let ours = {
            let rec = record.lock();
            rec.latest_state.clone()
        };
        let recorded = self.ledger.recorded_closing_serial(channel)?;
        if recorded < ours.serial {
            self.ledger.submit_appeal(channel, &ours)?;
            info!(
                "channel {}: appealed serial {} with serial {}",
                channel, recorded, ours.serial
            );
        } else {
            debug!(
                "channel {}: recorded serial {} already current, no appeal",
                channel, recorded
            );
        }

        // either way the channel is closing on the ledger; reflect that
        let mut rec = record.lock();
        rec.phase = ChannelPhase::Closing;
        rec.appeal_deadline = Some(deadline);
        Ok(())
    }

    /// Collect this node's share once the appeal window has elapsed.
    ///
    /// Skips the ledger transaction entirely when there is nothing to
    /// collect, but always forgets the channel on success.
    pub fn withdraw_funds(&self, channel: Address) -> NodeResult<()> {
        let _record = self.record(&channel)?;

        if self.ledger.status(channel)? != ChannelStatus::Closed {
            return Err(NodeError::NotYetWithdrawable);
        }

        let balance = self.ledger.channel_balance(channel, self.address)?;
        if balance > 0 {
            self.ledger.submit_withdraw(channel, self.address)?;
            info!("channel {}: withdrew {}", channel, balance);
        } else {
            debug!("channel {}: nothing to withdraw, skipping transaction", channel);
        }

        self.channels.remove(&channel);
        Ok(())
    }

    // ---- remote message handlers -------------------------------------
    //
    // Triggered by untrusted peers: all validation failures are logged
    // and dropped, never raised.

    /// Handle a peer's notification of a channel it funded for us
    pub fn notify_of_channel(&self, channel: Address, sender_location: SocketAddr) {
        if let Err(reason) = self.try_notify(channel, sender_location) {
            debug!("dropping channel notification for {}: {}", channel, reason);
        }
    }

    /// Handle an incoming funds transfer
    pub fn receive_funds(&self, msg: ChannelStateMsg) {
        if let Err(reason) = self.try_receive_funds(&msg) {
            debug!("dropping funds transfer on {}: {}", msg.channel, reason);
        }
    }

    /// Handle the peer's acknowledgment of a transfer we sent
    pub fn ack_transfer(&self, msg: ChannelStateMsg) {
        if let Err(reason) = self.try_ack_transfer(&msg) {
            debug!("dropping transfer ack on {}: {}", msg.channel, reason);
        }
    }

    fn try_notify(&self, channel: Address, sender_location: SocketAddr) -> Result<(), Reject> {
        if self.channels.contains_key(&channel) {
            return Err(Reject::AlreadyKnown);
        }
        let (party1, party2) = self.ledger.parties(channel)?;
        if party2 != self.address {
            return Err(Reject::NotOurChannel);
        }
        if self.ledger.status(channel)? != ChannelStatus::Open {
            return Err(Reject::AlreadyClosed);
        }
        let period = self.ledger.appeal_period(channel)?;
        if period < self.config.min_appeal_period {
            return Err(Reject::AppealPeriodTooShort {
                got: period,
                min: self.config.min_appeal_period,
            });
        }

        let funding = self.ledger.funding(channel)?;
        let initial =
            ChannelStateMsg::initial(channel, funding, &self.key).map_err(|_| Reject::Signing)?;
        let record = ChannelRecord::open(channel, Party::Two, party1, sender_location, initial);
        match self.channels.entry(channel) {
            Entry::Occupied(_) => Err(Reject::AlreadyKnown),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(record)));
                info!("channel {} established by peer {}", channel, party1);
                Ok(())
            }
        }
    }

    fn try_receive_funds(&self, msg: &ChannelStateMsg) -> Result<(), Reject> {
        let record = self
            .channels
            .get(&msg.channel)
            .map(|entry| entry.value().clone())
            .ok_or(Reject::UnknownChannel)?;

        let (peer_location, ack) = {
            let mut rec = record.lock();
            rec.check_incoming_transfer(msg)?;
            let ack = msg.countersigned(&self.key).map_err(|_| Reject::Signing)?;
            rec.accept(msg.clone());
            (rec.peer_location, ack)
        };

        debug!(
            "channel {}: accepted transfer at serial {}",
            msg.channel, msg.serial
        );
        self.transport
            .send(peer_location, PeerMessage::AckTransfer(ack));
        Ok(())
    }

    fn try_ack_transfer(&self, msg: &ChannelStateMsg) -> Result<(), Reject> {
        let record = self
            .channels
            .get(&msg.channel)
            .map(|entry| entry.value().clone())
            .ok_or(Reject::UnknownChannel)?;

        let mut rec = record.lock();
        rec.check_ack(msg)?;
        rec.accept(msg.clone());
        debug!(
            "channel {}: peer acknowledged serial {}",
            msg.channel, msg.serial
        );
        Ok(())
    }
}

impl MessageHandler for LightningNode {
    fn handle(&self, msg: PeerMessage) {
        match msg {
            PeerMessage::NotifyChannel(notify) => {
                self.notify_of_channel(notify.channel, notify.sender_location)
            }
            PeerMessage::ReceiveFunds(state) => self.receive_funds(state),
            PeerMessage::AckTransfer(state) => self.ack_transfer(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use volt_ledger::{LedgerResult, SimLedger, SimLedgerClient};
    use volt_net::InProcNet;
    use volt_primitives::{BlockNumber, Serial};

    const FUNDS: Amount = 100;
    const APPEAL_PERIOD: u64 = 10;

    /// Delegating ledger client that counts submitted transactions.
    struct CountingLedger {
        inner: SimLedgerClient,
        closes: AtomicUsize,
        appeals: AtomicUsize,
        withdraws: AtomicUsize,
    }

    impl CountingLedger {
        fn new(inner: SimLedgerClient) -> Self {
            Self {
                inner,
                closes: AtomicUsize::new(0),
                appeals: AtomicUsize::new(0),
                withdraws: AtomicUsize::new(0),
            }
        }
    }

    impl LedgerClient for CountingLedger {
        fn deploy_channel(
            &self,
            party1: Address,
            party2: Address,
            appeal_period: u64,
            funding: Amount,
        ) -> LedgerResult<Address> {
            self.inner.deploy_channel(party1, party2, appeal_period, funding)
        }
        fn block_number(&self) -> LedgerResult<BlockNumber> {
            self.inner.block_number()
        }
        fn account_balance(&self, account: Address) -> LedgerResult<Amount> {
            self.inner.account_balance(account)
        }
        fn status(&self, channel: Address) -> LedgerResult<ChannelStatus> {
            self.inner.status(channel)
        }
        fn parties(&self, channel: Address) -> LedgerResult<(Address, Address)> {
            self.inner.parties(channel)
        }
        fn appeal_period(&self, channel: Address) -> LedgerResult<u64> {
            self.inner.appeal_period(channel)
        }
        fn funding(&self, channel: Address) -> LedgerResult<Amount> {
            self.inner.funding(channel)
        }
        fn recorded_closing_serial(&self, channel: Address) -> LedgerResult<Serial> {
            self.inner.recorded_closing_serial(channel)
        }
        fn appeal_deadline(&self, channel: Address) -> LedgerResult<BlockNumber> {
            self.inner.appeal_deadline(channel)
        }
        fn channel_balance(&self, channel: Address, party: Address) -> LedgerResult<Amount> {
            self.inner.channel_balance(channel, party)
        }
        fn submit_close(&self, channel: Address, state: &ChannelStateMsg) -> LedgerResult<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            self.inner.submit_close(channel, state)
        }
        fn submit_appeal(&self, channel: Address, state: &ChannelStateMsg) -> LedgerResult<()> {
            self.appeals.fetch_add(1, Ordering::SeqCst);
            self.inner.submit_appeal(channel, state)
        }
        fn submit_withdraw(&self, channel: Address, party: Address) -> LedgerResult<()> {
            self.withdraws.fetch_add(1, Ordering::SeqCst);
            self.inner.submit_withdraw(channel, party)
        }
    }

    struct TestNode {
        node: Arc<LightningNode>,
        ledger: Arc<CountingLedger>,
    }

    struct Setup {
        chain: SimLedger,
        net: Arc<InProcNet>,
        a: TestNode,
        b: TestNode,
    }

    fn spawn_node(chain: &SimLedger, net: &Arc<InProcNet>, port: u16) -> TestNode {
        let key = PrivateKey::random(&mut OsRng);
        let address = public_key_to_address(key.verifying_key());
        chain.fund_account(address, FUNDS);

        let location: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
        let mut config = NodeConfig::new(location);
        config.appeal_period = APPEAL_PERIOD;

        let ledger = Arc::new(CountingLedger::new(chain.client(address)));
        let node = Arc::new(LightningNode::new(
            key,
            config,
            ledger.clone(),
            net.clone(),
        ));
        net.register(location, node.clone());
        TestNode { node, ledger }
    }

    fn setup() -> Setup {
        let chain = SimLedger::new();
        let net = Arc::new(InProcNet::new());
        let a = spawn_node(&chain, &net, 9001);
        let b = spawn_node(&chain, &net, 9002);
        Setup { chain, net, a, b }
    }

    fn open_channel(s: &Setup, amount: Amount) -> Address {
        s.a.node
            .establish_channel(s.b.node.address(), s.b.node.location(), amount)
            .unwrap()
    }

    #[test]
    fn test_establish_notifies_peer() {
        let s = setup();
        let channel = open_channel(&s, 10);

        assert_eq!(s.a.node.channels(), vec![channel]);
        assert_eq!(s.b.node.channels(), vec![channel]);

        let state_a = s.a.node.channel_state(channel).unwrap();
        let state_b = s.b.node.channel_state(channel).unwrap();
        assert_eq!(state_a.serial, 0);
        assert_eq!(state_b.serial, 0);
        assert_eq!(state_a.balance1, 10);
        assert_eq!(state_b.balance1, 10);
        assert_eq!(s.chain.account_balance(s.a.node.address()), FUNDS - 10);
    }

    #[test]
    fn test_establish_rejects_bad_amounts() {
        let s = setup();
        let peer = (s.b.node.address(), s.b.node.location());
        assert!(matches!(
            s.a.node.establish_channel(peer.0, peer.1, 0),
            Err(NodeError::InvalidAmount(_))
        ));
        assert!(matches!(
            s.a.node.establish_channel(peer.0, peer.1, FUNDS + 1),
            Err(NodeError::InvalidAmount(_))
        ));
        assert!(s.b.node.channels().is_empty());
    }

    #[test]
    fn test_send_updates_both_sides() {
        let s = setup();
        let channel = open_channel(&s, 10);

        s.a.node.send(channel, 3).unwrap();

        // the ack came back synchronously through the in-proc router
        let state_a = s.a.node.channel_state(channel).unwrap();
        assert_eq!(state_a.serial, 1);
        assert_eq!(state_a.balance1, 7);
        assert_eq!(state_a.balance2, 3);
        assert!(state_a.is_signed_by(&s.b.node.address()));
        assert!(s.a.node.pending_state(channel).unwrap().is_none());

        let state_b = s.b.node.channel_state(channel).unwrap();
        assert_eq!(state_b.serial, 1);
        assert_eq!(state_b.balance2, 3);
        assert!(state_b.is_signed_by(&s.a.node.address()));

        // and back the other way
        s.b.node.send(channel, 2).unwrap();
        let state_a = s.a.node.channel_state(channel).unwrap();
        assert_eq!(state_a.serial, 2);
        assert_eq!(state_a.balance1, 9);
        assert_eq!(state_a.balance2, 1);
    }

    #[test]
    fn test_send_invalid_amounts_never_reach_the_wire() {
        let s = setup();
        let channel = open_channel(&s, 10);
        let serial_before = s.b.node.channel_state(channel).unwrap().serial;

        assert!(matches!(
            s.a.node.send(channel, 0),
            Err(NodeError::InvalidAmount(_))
        ));
        assert!(matches!(
            s.a.node.send(channel, 11),
            Err(NodeError::InvalidAmount(_))
        ));

        // the peer never saw a message
        assert_eq!(
            s.b.node.channel_state(channel).unwrap().serial,
            serial_before
        );
        assert!(s.a.node.pending_state(channel).unwrap().is_none());
    }

    #[test]
    fn test_send_on_unknown_or_closed_channel() {
        let s = setup();
        let bogus = Address::from_bytes([0xcc; 20]);
        assert!(matches!(
            s.a.node.send(bogus, 1),
            Err(NodeError::UnknownChannel)
        ));

        let channel = open_channel(&s, 10);
        s.a.node.close_channel(channel, None).unwrap();
        assert!(matches!(
            s.a.node.send(channel, 1),
            Err(NodeError::ChannelClosed)
        ));
    }

    #[test]
    fn test_double_close_fails_without_second_transaction() {
        let s = setup();
        let channel = open_channel(&s, 10);

        s.a.node.close_channel(channel, None).unwrap();
        assert_eq!(s.a.ledger.closes.load(Ordering::SeqCst), 1);

        assert!(matches!(
            s.a.node.close_channel(channel, None),
            Err(NodeError::ChannelClosed)
        ));
        assert_eq!(s.a.ledger.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_appeal_not_needed_while_open() {
        let s = setup();
        let channel = open_channel(&s, 10);
        assert!(matches!(
            s.b.node.appeal_closed_channel(channel),
            Err(NodeError::AppealNotNeeded(_))
        ));
        assert_eq!(s.b.ledger.appeals.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_appeal_after_deadline_fails() {
        let s = setup();
        let channel = open_channel(&s, 10);
        s.a.node.send(channel, 3).unwrap();
        let stale = s.a.node.channel_state(channel).unwrap();
        s.a.node.send(channel, 2).unwrap();

        s.a.node.close_channel(channel, Some(stale)).unwrap();
        s.chain.advance_blocks(APPEAL_PERIOD);

        assert!(matches!(
            s.b.node.appeal_closed_channel(channel),
            Err(NodeError::AppealWindowExpired)
        ));
        assert_eq!(s.b.ledger.appeals.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_appeal_corrects_stale_close() {
        let s = setup();
        let channel = open_channel(&s, 10);

        s.a.node.send(channel, 1).unwrap();
        let stale = s.a.node.channel_state(channel).unwrap();
        s.a.node.send(channel, 2).unwrap();

        // A cheats: closes with the serial-1 state
        s.a.node.close_channel(channel, Some(stale)).unwrap();

        s.b.node.appeal_closed_channel(channel).unwrap();
        assert_eq!(s.b.ledger.appeals.load(Ordering::SeqCst), 1);
        assert_eq!(
            s.b.ledger.recorded_closing_serial(channel).unwrap(),
            2
        );

        // a second appeal is a successful no-op
        s.b.node.appeal_closed_channel(channel).unwrap();
        assert_eq!(s.b.ledger.appeals.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_withdraw_lifecycle() {
        let s = setup();
        let channel = open_channel(&s, 10);
        s.a.node.send(channel, 3).unwrap();
        s.a.node.close_channel(channel, None).unwrap();

        assert!(matches!(
            s.b.node.withdraw_funds(channel),
            Err(NodeError::NotYetWithdrawable)
        ));

        s.chain.advance_blocks(APPEAL_PERIOD);

        s.b.node.withdraw_funds(channel).unwrap();
        s.a.node.withdraw_funds(channel).unwrap();
        assert!(s.a.node.channels().is_empty());
        assert!(s.b.node.channels().is_empty());
        assert_eq!(s.chain.account_balance(s.a.node.address()), FUNDS - 3);
        assert_eq!(s.chain.account_balance(s.b.node.address()), FUNDS + 3);

        // the record is gone, so a second withdraw is UnknownChannel
        assert!(matches!(
            s.b.node.withdraw_funds(channel),
            Err(NodeError::UnknownChannel)
        ));
    }

    #[test]
    fn test_withdraw_with_zero_balance_skips_transaction() {
        let s = setup();
        let channel = open_channel(&s, 10);
        // no transfers: everything is still on A's side
        s.a.node.close_channel(channel, None).unwrap();
        s.chain.advance_blocks(APPEAL_PERIOD);

        s.b.node.withdraw_funds(channel).unwrap();
        assert_eq!(s.b.ledger.withdraws.load(Ordering::SeqCst), 0);
        assert!(s.b.node.channels().is_empty());
        assert_eq!(s.chain.account_balance(s.b.node.address()), FUNDS);

        s.a.node.withdraw_funds(channel).unwrap();
        assert_eq!(s.a.ledger.withdraws.load(Ordering::SeqCst), 1);
        assert_eq!(s.chain.account_balance(s.a.node.address()), FUNDS);
    }

    #[test]
    fn test_unknown_channel_messages_are_dropped() {
        let s = setup();
        let channel = open_channel(&s, 10);

        // a third node that was never notified
        let c = spawn_node(&s.chain, &s.net, 9003);
        let state = s.a.node.channel_state(channel).unwrap();
        c.node.receive_funds(state.clone());
        c.node.ack_transfer(state);

        assert!(c.node.channels().is_empty());
        assert!(matches!(
            c.node.channel_state(channel),
            Err(NodeError::UnknownChannel)
        ));
    }

    #[test]
    fn test_replayed_and_forged_transfers_are_dropped() {
        let s = setup();
        let channel = open_channel(&s, 10);
        s.a.node.send(channel, 3).unwrap();

        let accepted = s.b.node.channel_state(channel).unwrap();

        // replay of the same serial
        s.b.node.receive_funds(accepted.clone());
        assert_eq!(s.b.node.channel_state(channel).unwrap().serial, 1);

        // forged state breaking the channel total
        let mut forged = accepted;
        forged.serial = 2;
        forged.balance2 += 5;
        s.b.node.receive_funds(forged);
        assert_eq!(s.b.node.channel_state(channel).unwrap().serial, 1);
        assert_eq!(s.b.node.channel_state(channel).unwrap().balance2, 3);
    }

    #[test]
    fn test_notify_rejected_when_not_second_party() {
        let s = setup();
        let channel = open_channel(&s, 10);

        // a bystander hears about a channel it is no party to
        let c = spawn_node(&s.chain, &s.net, 9004);
        c.node.notify_of_channel(channel, s.a.node.location());
        assert!(c.node.channels().is_empty());

        // and the funder itself is not the second party
        s.a.node.notify_of_channel(channel, s.b.node.location());
        assert_eq!(s.a.node.channels().len(), 1);
    }

    #[test]
    fn test_notify_rejects_short_appeal_period() {
        let s = setup();
        // deploy directly with a window below B's configured minimum
        let short = s
            .chain
            .client(s.a.node.address())
            .deploy_channel(s.a.node.address(), s.b.node.address(), 2, 10)
            .unwrap();

        s.b.node.notify_of_channel(short, s.a.node.location());
        assert!(s.b.node.channels().is_empty());
    }

    #[test]
    fn test_notify_is_idempotent() {
        let s = setup();
        let channel = open_channel(&s, 10);
        let before = s.b.node.channel_state(channel).unwrap();

        s.b.node.notify_of_channel(channel, s.a.node.location());
        assert_eq!(s.b.node.channels().len(), 1);
        assert_eq!(s.b.node.channel_state(channel).unwrap(), before);
    }

    #[test]
    fn test_chained_sends_before_ack() {
        let s = setup();
        let channel = open_channel(&s, 10);

        // unregister B so acks stop flowing
        s.net.unregister(&s.b.node.location());

        s.a.node.send(channel, 1).unwrap();
        s.a.node.send(channel, 2).unwrap();

        // both transfers chained on the pending state
        let pending = s.a.node.pending_state(channel).unwrap().unwrap();
        assert_eq!(pending.serial, 2);
        assert_eq!(pending.balance1, 7);
        // the accepted tip is still the baseline
        assert_eq!(s.a.node.channel_state(channel).unwrap().serial, 0);

        // overdraw against the pending balance is refused
        assert!(matches!(
            s.a.node.send(channel, 8),
            Err(NodeError::InvalidAmount(_))
        ));
    }
}
