//! Operation kind table.
//!
//! The declaration order below is the binary wire format: an operation's code
//! is its position in [`OpKind::ALL`]. Append new kinds at the end only.

use std::fmt;
use std::str::FromStr;

macro_rules! op_kinds {
    ($($variant:ident => $name:literal),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u16)]
        pub enum OpKind {
            $($variant),*
        }

        impl OpKind {
            pub const ALL: &'static [OpKind] = &[$(OpKind::$variant),*];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(OpKind::$variant => $name),*
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(OpKind::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

op_kinds! {
    Vote => "vote",
    Comment => "comment",
    Transfer => "transfer",
    TransferToScorumpower => "transfer_to_scorumpower",
    WithdrawScorumpower => "withdraw_scorumpower",
    AccountCreateByCommittee => "account_create_by_committee",
    AccountCreate => "account_create",
    AccountCreateWithDelegation => "account_create_with_delegation",
    AccountUpdate => "account_update",
    WitnessUpdate => "witness_update",
    AccountWitnessVote => "account_witness_vote",
    AccountWitnessProxy => "account_witness_proxy",
    DeleteComment => "delete_comment",
    CommentOptions => "comment_options",
    SetWithdrawScorumpowerRouteToAccount => "set_withdraw_scorumpower_route_to_account",
    SetWithdrawScorumpowerRouteToDevPool => "set_withdraw_scorumpower_route_to_dev_pool",
    ProveAuthority => "prove_authority",
    RequestAccountRecovery => "request_account_recovery",
    RecoverAccount => "recover_account",
    ChangeRecoveryAccount => "change_recovery_account",
    EscrowApprove => "escrow_approve",
    EscrowDispute => "escrow_dispute",
    EscrowRelease => "escrow_release",
    EscrowTransfer => "escrow_transfer",
    DeclineVotingRights => "decline_voting_rights",
    DelegateScorumpower => "delegate_scorumpower",
    CreateBudget => "create_budget",
    CloseBudget => "close_budget",
    ProposalVote => "proposal_vote_operation",
    ProposalCreate => "proposal_create_operation",
    AtomicswapInitiate => "atomicswap_initiate_operation",
    AtomicswapRedeem => "atomicswap_redeem_operation",
    AtomicswapRefund => "atomicswap_refund_operation",
    CloseBudgetByAdvertisingModerator => "close_budget_by_advertising_moderator",
    UpdateBudget => "update_budget",
    CreateGame => "create_game",
    CancelGame => "cancel_game",
    UpdateGameMarkets => "update_game_markets",
    UpdateGameStartTime => "update_game_start_time",
    PostGameResults => "post_game_results",
    PostBet => "post_bet",
    CancelPendingBets => "cancel_pending_bets",
    DelegateSpFromRegPool => "delegate_sp_from_reg_pool",
    CreateNft => "create_nft",
    UpdateNftMeta => "update_nft_meta",
    CreateGameRound => "create_game_round",
    UpdateGameRoundResult => "update_game_round_result",
    AdjustNftExperience => "adjust_nft_experience",
    UpdateNftName => "update_nft_name",
    Burn => "burn",
    // virtual operations
    CommentBenefactorReward => "comment_benefactor_reward",
    CommentPayoutUpdate => "comment_payout_update",
    CommentReward => "comment_reward",
    CurationReward => "curation_reward",
    FillScorumpowerWithdraw => "fill_scorumpower_withdraw",
    Hardfork => "hardfork",
    ProducerReward => "producer_reward",
    ReturnScorumpowerDelegation => "return_scorumpower_delegation",
    ShutdownWitness => "shutdown_witness",
    WitnessMissBlock => "witness_miss_block",
    ExpiredContractRefund => "expired_contract_refund",
    AccFinishedVestingWithdraw => "acc_finished_vesting_withdraw",
    DevpoolFinishedVestingWithdraw => "devpool_finished_vesting_withdraw",
    AccToAccVestingWithdraw => "acc_to_acc_vesting_withdraw",
    DevpoolToAccVestingWithdraw => "devpool_to_acc_vesting_withdraw",
    AccToDevpoolVestingWithdraw => "acc_to_devpool_vesting_withdraw",
    DevpoolToDevpoolVestingWithdraw => "devpool_to_devpool_vesting_withdraw",
    ProposalVirtual => "proposal_virtual",
    ActiveSpHoldersRewardLegacy => "active_sp_holders_reward_legacy",
    AllocateCashFromAdvertisingBudget => "allocate_cash_from_advertising_budget",
    CashBackFromAdvertisingBudgetToOwner => "cash_back_from_advertising_budget_to_owner",
    ClosingBudget => "closing_budget",
    BetsMatched => "bets_matched",
    GameStatusChanged => "game_status_changed",
    BetResolved => "bet_resolved",
    BetCancelled => "bet_cancelled",
    BetRestored => "bet_restored",
    BetUpdated => "bet_updated",
}

impl OpKind {
    /// Stable binary code.
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }
}

impl FromStr for OpKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown operation kind '{s}'"))
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_is_declaration_position() {
        for (position, kind) in OpKind::ALL.iter().enumerate() {
            assert_eq!(usize::from(kind.code()), position);
            assert_eq!(OpKind::from_code(kind.code()), Some(*kind));
            assert_eq!(OpKind::from_name(kind.as_str()), Some(*kind));
        }
        assert_eq!(OpKind::ALL.len(), 78);
    }

    #[test]
    fn test_published_codes() {
        assert_eq!(OpKind::Vote.code(), 0);
        assert_eq!(OpKind::Transfer.code(), 2);
        assert_eq!(OpKind::AccountCreateByCommittee.code(), 5);
        assert_eq!(OpKind::AccountCreate.code(), 6);
        assert_eq!(OpKind::CreateGame.code(), 0x23);
        assert_eq!(OpKind::PostGameResults.code(), 0x27);
        assert_eq!(OpKind::PostBet.code(), 0x28);
        assert_eq!(OpKind::CancelPendingBets.code(), 0x29);
        assert_eq!(OpKind::CreateNft.code(), 0x2b);
        assert_eq!(OpKind::UpdateNftMeta.code(), 0x2c);
        assert_eq!(OpKind::CreateGameRound.code(), 0x2d);
        assert_eq!(OpKind::UpdateGameRoundResult.code(), 0x2e);
        assert_eq!(OpKind::BetUpdated.code(), 77);
    }

    #[test]
    fn test_unknown_names() {
        assert_eq!(OpKind::from_name("author_reward"), None);
        assert!("doka_trade".parse::<OpKind>().is_err());
        assert_eq!(OpKind::from_code(78), None);
    }
}
