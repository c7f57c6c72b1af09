use strum::FromRepr;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
pub enum MsgId {
    Hello = 1,
    HelloAck = 2,
    Bye = 3,

    InputWindow = 20,

    Ping = 30,
    Pong = 31,
}
