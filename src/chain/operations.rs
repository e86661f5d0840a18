//! Typed operations and the `[kind, payload]` JSON tuple they travel in.
//!
//! Kinds without a typed payload, and kinds this crate has never heard of,
//! decode into [`Operation::Unknown`] and re-serialize unchanged.

use crate::chain::asset::Asset;
use crate::chain::authority::Authority;
use crate::chain::betting::{
    BetCancelKind, BetResolveKind, GameStatus, GameType, Market, Odds, Wincase,
};
use crate::chain::encoder::{Encode, EncodeError, Encoder};
use crate::chain::keys::PublicKey;
use crate::chain::registry::OpKind;
use crate::chain::time::ChainTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOperation {
    pub voter: String,
    pub author: String,
    pub permlink: String,
    pub weight: i16,
}

impl Encode for VoteOperation {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_str(&self.voter);
        enc.write_str(&self.author);
        enc.write_str(&self.permlink);
        enc.write_i16(self.weight);
        Ok(())
    }
}

/// A post when `parent_author` is empty, a reply otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentOperation {
    pub parent_author: String,
    pub parent_permlink: String,
    pub author: String,
    pub permlink: String,
    pub title: String,
    pub body: String,
    pub json_metadata: String,
}

impl CommentOperation {
    pub fn is_post(&self) -> bool {
        self.parent_author.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteCommentOperation {
    pub author: String,
    pub permlink: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentOptionsOperation {
    pub author: String,
    pub permlink: String,
    pub max_accepted_payout: Asset,
    pub percent_scrs: u16,
    pub allow_votes: bool,
    pub allow_curation_rewards: bool,
    #[serde(default)]
    pub extensions: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOperation {
    pub from: String,
    pub to: String,
    pub amount: Asset,
    pub memo: String,
}

impl Encode for TransferOperation {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_str(&self.from);
        enc.write_str(&self.to);
        self.amount.encode(enc)?;
        enc.write_str(&self.memo);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferToScorumpowerOperation {
    pub from: String,
    pub to: String,
    pub amount: Asset,
}

impl Encode for TransferToScorumpowerOperation {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_str(&self.from);
        enc.write_str(&self.to);
        self.amount.encode(enc)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawScorumpowerOperation {
    pub account: String,
    pub scorumpower: Asset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateScorumpowerOperation {
    pub delegator: String,
    pub delegatee: String,
    pub scorumpower: Asset,
}

impl Encode for DelegateScorumpowerOperation {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_str(&self.delegator);
        enc.write_str(&self.delegatee);
        self.scorumpower.encode(enc)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateSpFromRegPoolOperation {
    pub reg_committee_member: String,
    pub delegatee: String,
    pub scorumpower: Asset,
}

impl Encode for DelegateSpFromRegPoolOperation {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_str(&self.reg_committee_member);
        enc.write_str(&self.delegatee);
        self.scorumpower.encode(enc)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnOperation {
    pub owner: String,
    pub to: String,
    pub amount: Asset,
}

impl Encode for BurnOperation {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_str(&self.owner);
        enc.write_str(&self.to);
        self.amount.encode(enc)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCreateOperation {
    pub fee: Asset,
    pub creator: String,
    pub new_account_name: String,
    pub owner: Authority,
    pub active: Authority,
    pub posting: Authority,
    pub memo_key: PublicKey,
    pub json_metadata: String,
}

impl Encode for AccountCreateOperation {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        self.fee.encode(enc)?;
        enc.write_str(&self.creator);
        enc.write_str(&self.new_account_name);
        self.owner.encode(enc)?;
        self.active.encode(enc)?;
        self.posting.encode(enc)?;
        self.memo_key.encode(enc)?;
        enc.write_str(&self.json_metadata);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCreateByCommitteeOperation {
    pub creator: String,
    pub new_account_name: String,
    pub owner: Authority,
    pub active: Authority,
    pub posting: Authority,
    pub memo_key: PublicKey,
    pub json_metadata: String,
}

impl Encode for AccountCreateByCommitteeOperation {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_str(&self.creator);
        enc.write_str(&self.new_account_name);
        self.owner.encode(enc)?;
        self.active.encode(enc)?;
        self.posting.encode(enc)?;
        self.memo_key.encode(enc)?;
        enc.write_str(&self.json_metadata);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCreateWithDelegationOperation {
    pub fee: Asset,
    pub creator: String,
    pub new_account_name: String,
    pub owner: Authority,
    pub active: Authority,
    pub posting: Authority,
    pub memo_key: PublicKey,
    pub json_metadata: String,
    #[serde(default)]
    pub extensions: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUpdateOperation {
    pub account: String,
    pub owner: Authority,
    pub active: Authority,
    pub posting: Authority,
    pub memo_key: PublicKey,
    pub json_metadata: String,
}

impl Encode for AccountUpdateOperation {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_str(&self.account);
        self.owner.encode(enc)?;
        self.active.encode(enc)?;
        self.posting.encode(enc)?;
        self.memo_key.encode(enc)?;
        enc.write_str(&self.json_metadata);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessProps {
    pub account_creation_fee: Asset,
    pub maximum_block_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessUpdateOperation {
    pub owner: String,
    pub url: String,
    /// Kept as text: a resigning witness publishes the all-zero key, which is
    /// not a valid curve point.
    pub block_signing_key: String,
    pub props: WitnessProps,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<Asset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountWitnessVoteOperation {
    pub account: String,
    pub witness: String,
    pub approve: bool,
}

impl Encode for AccountWitnessVoteOperation {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_str(&self.account);
        enc.write_str(&self.witness);
        enc.write_bool(self.approve);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerRewardOperation {
    pub producer: String,
    pub reward: Asset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGameOperation {
    pub uuid: Uuid,
    pub moderator: String,
    pub json_metadata: String,
    pub game: GameType,
    pub start_time: ChainTime,
    pub auto_resolve_delay_sec: u32,
    #[serde(default)]
    pub markets: Vec<Market>,
}

impl Encode for CreateGameOperation {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_uuid(&self.uuid);
        enc.write_str(&self.moderator);
        enc.write_str(&self.json_metadata);
        self.start_time.encode(enc)?;
        enc.write_u32(self.auto_resolve_delay_sec);
        self.game.encode(enc)?;
        enc.encode_seq(&self.markets)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelGameOperation {
    pub uuid: Uuid,
    pub moderator: String,
}

impl Encode for CancelGameOperation {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_uuid(&self.uuid);
        enc.write_str(&self.moderator);
        Ok(())
    }
}

/// Replaces the market list of a game that has not started yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateGameMarketsOperation {
    pub uuid: Uuid,
    pub moderator: String,
    #[serde(default)]
    pub markets: Vec<Market>,
}

impl Encode for UpdateGameMarketsOperation {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_uuid(&self.uuid);
        enc.write_str(&self.moderator);
        enc.encode_seq(&self.markets)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateGameStartTimeOperation {
    pub uuid: Uuid,
    pub moderator: String,
    pub start_time: ChainTime,
}

impl Encode for UpdateGameStartTimeOperation {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_uuid(&self.uuid);
        enc.write_str(&self.moderator);
        self.start_time.encode(enc)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostGameResultsOperation {
    pub uuid: Uuid,
    pub moderator: String,
    pub wincases: Vec<Wincase>,
}

impl Encode for PostGameResultsOperation {
    // The wincase count is a single signed byte on the wire, not a varint.
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        let count = i8::try_from(self.wincases.len()).map_err(|_| {
            EncodeError::CollectionTooLarge {
                len: self.wincases.len(),
                max: i8::MAX as usize,
            }
        })?;
        enc.write_uuid(&self.uuid);
        enc.write_str(&self.moderator);
        enc.write_i8(count);
        self.wincases.iter().try_for_each(|w| w.encode(enc))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostBetOperation {
    pub uuid: Uuid,
    pub better: String,
    pub game_uuid: Uuid,
    pub wincase: Wincase,
    pub odds: Odds,
    pub stake: Asset,
    pub live: bool,
}

impl Encode for PostBetOperation {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_uuid(&self.uuid);
        enc.write_str(&self.better);
        enc.write_uuid(&self.game_uuid);
        self.wincase.encode(enc)?;
        self.odds.encode(enc)?;
        self.stake.encode(enc)?;
        enc.write_bool(self.live);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelPendingBetsOperation {
    pub bet_uuids: Vec<Uuid>,
    pub better: String,
}

impl Encode for CancelPendingBetsOperation {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.encode_seq(&self.bet_uuids)?;
        enc.write_str(&self.better);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetsMatchedOperation {
    pub bet1_uuid: Uuid,
    pub bet2_uuid: Uuid,
    pub better1: String,
    pub better2: String,
    pub matched_stake1: Asset,
    pub matched_stake2: Asset,
    pub matched_bet_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatusChangedOperation {
    pub game_uuid: Uuid,
    pub old_status: GameStatus,
    pub new_status: GameStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetResolvedOperation {
    pub game_uuid: Uuid,
    pub better: String,
    pub bet_uuid: Uuid,
    pub income: Asset,
    pub kind: BetResolveKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetCancelledOperation {
    pub game_uuid: Uuid,
    pub better: String,
    pub bet_uuid: Uuid,
    pub stake: Asset,
    pub kind: BetCancelKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateNftOperation {
    pub owner: String,
    pub uuid: Uuid,
    pub name: String,
    pub json_metadata: String,
    pub initial_power: i32,
}

impl Encode for CreateNftOperation {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_str(&self.owner);
        enc.write_uuid(&self.uuid);
        enc.write_str(&self.name);
        enc.write_str(&self.json_metadata);
        enc.write_i32(self.initial_power);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateNftMetaOperation {
    pub moderator: String,
    pub uuid: Uuid,
    pub json_metadata: String,
}

impl Encode for UpdateNftMetaOperation {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_str(&self.moderator);
        enc.write_uuid(&self.uuid);
        enc.write_str(&self.json_metadata);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustNftExperienceOperation {
    pub moderator: String,
    pub uuid: Uuid,
    pub experience: i32,
}

impl Encode for AdjustNftExperienceOperation {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_str(&self.moderator);
        enc.write_uuid(&self.uuid);
        enc.write_i32(self.experience);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateNftNameOperation {
    pub moderator: String,
    pub uuid: Uuid,
    pub name: String,
}

impl Encode for UpdateNftNameOperation {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_str(&self.moderator);
        enc.write_uuid(&self.uuid);
        enc.write_str(&self.name);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGameRoundOperation {
    pub owner: String,
    pub uuid: Uuid,
    pub verification_key: String,
    pub seed: String,
}

impl Encode for CreateGameRoundOperation {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_str(&self.owner);
        enc.write_uuid(&self.uuid);
        enc.write_str(&self.verification_key);
        enc.write_str(&self.seed);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateGameRoundResultOperation {
    pub owner: String,
    pub uuid: Uuid,
    pub proof: String,
    pub vrf: String,
    pub result: i32,
}

impl Encode for UpdateGameRoundResultOperation {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_str(&self.owner);
        enc.write_uuid(&self.uuid);
        enc.write_str(&self.proof);
        enc.write_str(&self.vrf);
        enc.write_i32(self.result);
        Ok(())
    }
}

/// Operation with no typed payload, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperation {
    pub kind: String,
    pub payload: Value,
}

macro_rules! operations {
    (
        encodable { $($enc:ident($enc_ty:ty) => $enc_kind:ident),* $(,)? }
        decode_only { $($dec:ident($dec_ty:ty) => $dec_kind:ident),* $(,)? }
    ) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum Operation {
            $($enc($enc_ty),)*
            $($dec($dec_ty),)*
            Unknown(UnknownOperation),
        }

        impl Operation {
            /// Registry kind, if the kind name is in the code table.
            pub fn kind(&self) -> Option<OpKind> {
                match self {
                    $(Self::$enc(_) => Some(OpKind::$enc_kind),)*
                    $(Self::$dec(_) => Some(OpKind::$dec_kind),)*
                    Self::Unknown(op) => OpKind::from_name(&op.kind),
                }
            }

            pub fn kind_name(&self) -> &str {
                match self {
                    $(Self::$enc(_) => OpKind::$enc_kind.as_str(),)*
                    $(Self::$dec(_) => OpKind::$dec_kind.as_str(),)*
                    Self::Unknown(op) => &op.kind,
                }
            }

            /// Decode a payload for `kind`; unrecognized kinds fall back to
            /// [`Operation::Unknown`].
            pub fn decode(kind: &str, payload: Value) -> Result<Self, serde_json::Error> {
                match OpKind::from_name(kind) {
                    $(Some(OpKind::$enc_kind) => serde_json::from_value(payload).map(Self::$enc),)*
                    $(Some(OpKind::$dec_kind) => serde_json::from_value(payload).map(Self::$dec),)*
                    _ => Ok(Self::Unknown(UnknownOperation {
                        kind: kind.to_string(),
                        payload,
                    })),
                }
            }
        }

        impl Serialize for Operation {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                match self {
                    $(Self::$enc(op) => (OpKind::$enc_kind.as_str(), op).serialize(serializer),)*
                    $(Self::$dec(op) => (OpKind::$dec_kind.as_str(), op).serialize(serializer),)*
                    Self::Unknown(op) => (&op.kind, &op.payload).serialize(serializer),
                }
            }
        }

        impl Encode for Operation {
            fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
                match self {
                    $(Self::$enc(op) => {
                        enc.write_uvarint(u64::from(OpKind::$enc_kind.code()));
                        op.encode(enc)
                    })*
                    $(Self::$dec(_) => Err(EncodeError::NotSerializable(
                        OpKind::$dec_kind.as_str().to_string(),
                    )),)*
                    Self::Unknown(op) => Err(EncodeError::NotSerializable(op.kind.clone())),
                }
            }
        }

        $(impl From<$enc_ty> for Operation {
            fn from(op: $enc_ty) -> Self {
                Self::$enc(op)
            }
        })*

        $(impl From<$dec_ty> for Operation {
            fn from(op: $dec_ty) -> Self {
                Self::$dec(op)
            }
        })*
    };
}

operations! {
    encodable {
        Vote(VoteOperation) => Vote,
        Transfer(TransferOperation) => Transfer,
        TransferToScorumpower(TransferToScorumpowerOperation) => TransferToScorumpower,
        AccountCreateByCommittee(AccountCreateByCommitteeOperation) => AccountCreateByCommittee,
        AccountCreate(AccountCreateOperation) => AccountCreate,
        AccountUpdate(AccountUpdateOperation) => AccountUpdate,
        AccountWitnessVote(AccountWitnessVoteOperation) => AccountWitnessVote,
        DelegateScorumpower(DelegateScorumpowerOperation) => DelegateScorumpower,
        CreateGame(CreateGameOperation) => CreateGame,
        CancelGame(CancelGameOperation) => CancelGame,
        UpdateGameMarkets(UpdateGameMarketsOperation) => UpdateGameMarkets,
        UpdateGameStartTime(UpdateGameStartTimeOperation) => UpdateGameStartTime,
        PostGameResults(PostGameResultsOperation) => PostGameResults,
        PostBet(PostBetOperation) => PostBet,
        CancelPendingBets(CancelPendingBetsOperation) => CancelPendingBets,
        DelegateSpFromRegPool(DelegateSpFromRegPoolOperation) => DelegateSpFromRegPool,
        CreateNft(CreateNftOperation) => CreateNft,
        UpdateNftMeta(UpdateNftMetaOperation) => UpdateNftMeta,
        CreateGameRound(CreateGameRoundOperation) => CreateGameRound,
        UpdateGameRoundResult(UpdateGameRoundResultOperation) => UpdateGameRoundResult,
        AdjustNftExperience(AdjustNftExperienceOperation) => AdjustNftExperience,
        UpdateNftName(UpdateNftNameOperation) => UpdateNftName,
        Burn(BurnOperation) => Burn,
    }
    decode_only {
        Comment(CommentOperation) => Comment,
        DeleteComment(DeleteCommentOperation) => DeleteComment,
        CommentOptions(CommentOptionsOperation) => CommentOptions,
        WithdrawScorumpower(WithdrawScorumpowerOperation) => WithdrawScorumpower,
        AccountCreateWithDelegation(AccountCreateWithDelegationOperation) => AccountCreateWithDelegation,
        WitnessUpdate(WitnessUpdateOperation) => WitnessUpdate,
        ProducerReward(ProducerRewardOperation) => ProducerReward,
        BetsMatched(BetsMatchedOperation) => BetsMatched,
        GameStatusChanged(GameStatusChangedOperation) => GameStatusChanged,
        BetResolved(BetResolvedOperation) => BetResolved,
        BetCancelled(BetCancelledOperation) => BetCancelled,
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (kind, payload): (String, Value) = Deserialize::deserialize(deserializer)?;
        Self::decode(&kind, payload).map_err(serde::de::Error::custom)
    }
}

/// Ordered operation list.
///
/// Accepts both `[[kind, payload], ...]` and the flat
/// `[kind, payload, kind, payload, ...]` shape; always serializes as pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Operations(pub Vec<Operation>);

impl Operations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: impl Into<Operation>) {
        self.0.push(op.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.0.iter()
    }
}

impl From<Vec<Operation>> for Operations {
    fn from(ops: Vec<Operation>) -> Self {
        Self(ops)
    }
}

impl FromIterator<Operation> for Operations {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Operations {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for Operations {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.0)
    }
}

impl<'de> Deserialize<'de> for Operations {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let items = Vec::<Value>::deserialize(deserializer)?;
        if !matches!(items.first(), Some(Value::String(_))) {
            return items
                .into_iter()
                .map(|item| Operation::deserialize(item).map_err(D::Error::custom))
                .collect();
        }

        if items.len() % 2 != 0 {
            return Err(D::Error::custom(
                "flat operation list must alternate kind and payload",
            ));
        }
        let mut ops = Vec::with_capacity(items.len() / 2);
        let mut iter = items.into_iter();
        while let (Some(kind), Some(payload)) = (iter.next(), iter.next()) {
            let Value::String(kind) = kind else {
                return Err(D::Error::custom("operation kind must be a string"));
            };
            ops.push(Operation::decode(&kind, payload).map_err(D::Error::custom)?);
        }
        Ok(Self(ops))
    }
}

impl Encode for Operations {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.encode_seq(&self.0)
    }
}
