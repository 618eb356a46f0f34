//! ERC20 call data and router bindings.
//!
//! ERC20 calls are encoded by hand: a 4-byte selector followed by 32-byte
//! left-padded words. Router swaps use `sol!` bindings.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

/// `transfer(address,uint256)`
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
/// `approve(address,uint256)`
pub const APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];
/// `allowance(address,address)`
pub const ALLOWANCE_SELECTOR: [u8; 4] = [0xdd, 0x62, 0xed, 0x3e];

sol! {
    /// UniswapV2-compatible router (PancakeSwap V2 on BSC testnet).
    interface IUniswapV2Router {
        function swapExactETHForTokens(
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external payable returns (uint256[] memory amounts);

        function swapExactTokensForETHSupportingFeeOnTransferTokens(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external;

        function swapExactTokensForTokensSupportingFeeOnTransferTokens(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external;
    }
}

fn address_word(address: Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_slice());
    word
}

fn encode_call(selector: [u8; 4], words: &[[u8; 32]]) -> Bytes {
    let mut data = Vec::with_capacity(4 + 32 * words.len());
    data.extend_from_slice(&selector);
    for word in words {
        data.extend_from_slice(word);
    }
    Bytes::from(data)
}

pub fn encode_transfer(to: Address, amount: U256) -> Bytes {
    encode_call(TRANSFER_SELECTOR, &[address_word(to), amount.to_be_bytes::<32>()])
}

pub fn encode_approve(spender: Address, amount: U256) -> Bytes {
    encode_call(APPROVE_SELECTOR, &[address_word(spender), amount.to_be_bytes::<32>()])
}

pub fn encode_allowance(owner: Address, spender: Address) -> Bytes {
    encode_call(ALLOWANCE_SELECTOR, &[address_word(owner), address_word(spender)])
}

/// Decode a single `uint256` return value. Empty output reads as zero.
pub fn decode_uint256(output: &[u8]) -> U256 {
    if output.len() < 32 {
        return U256::ZERO;
    }
    U256::from_be_slice(&output[..32])
}

/// Which router entry point a testnet swap uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterSwap {
    NativeForTokens,
    TokensForNative,
    TokensForTokens,
}

/// Encode a router swap. `amount_out_min` is the caller's slippage floor.
pub fn encode_router_swap(
    kind: RouterSwap,
    amount_in: U256,
    amount_out_min: U256,
    path: Vec<Address>,
    to: Address,
    deadline: U256,
) -> Bytes {
    let data = match kind {
        RouterSwap::NativeForTokens => IUniswapV2Router::swapExactETHForTokensCall {
            amountOutMin: amount_out_min,
            path,
            to,
            deadline,
        }
        .abi_encode(),
        RouterSwap::TokensForNative => {
            IUniswapV2Router::swapExactTokensForETHSupportingFeeOnTransferTokensCall {
                amountIn: amount_in,
                amountOutMin: amount_out_min,
                path,
                to,
                deadline,
            }
            .abi_encode()
        }
        RouterSwap::TokensForTokens => {
            IUniswapV2Router::swapExactTokensForTokensSupportingFeeOnTransferTokensCall {
                amountIn: amount_in,
                amountOutMin: amount_out_min,
                path,
                to,
                deadline,
            }
            .abi_encode()
        }
    };
    Bytes::from(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, keccak256};

    #[test]
    fn test_selectors_match_signatures() {
        assert_eq!(keccak256("transfer(address,uint256)")[..4], TRANSFER_SELECTOR);
        assert_eq!(keccak256("approve(address,uint256)")[..4], APPROVE_SELECTOR);
        assert_eq!(keccak256("allowance(address,address)")[..4], ALLOWANCE_SELECTOR);
    }

    #[test]
    fn test_transfer_layout() {
        let to = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
        let data = encode_transfer(to, U256::from(1000u64));
        assert_eq!(data.len(), 68);
        assert_eq!(&data[..4], &TRANSFER_SELECTOR);
        assert!(data[4..16].iter().all(|b| *b == 0));
        assert_eq!(&data[16..36], to.as_slice());
        assert_eq!(U256::from_be_slice(&data[36..68]), U256::from(1000u64));
    }

    #[test]
    fn test_max_approve_is_all_ones() {
        let spender = address!("1231deb6f5749ef6ce6943a275a1d3e7486f4eae");
        let data = encode_approve(spender, U256::MAX);
        assert!(data[36..68].iter().all(|b| *b == 0xff));
    }

    #[test]
    fn test_decode_uint256() {
        assert_eq!(decode_uint256(&[]), U256::ZERO);
        let mut word = [0u8; 32];
        word[31] = 7;
        assert_eq!(decode_uint256(&word), U256::from(7u64));
    }

    #[test]
    fn test_router_swap_selector() {
        let data = encode_router_swap(
            RouterSwap::NativeForTokens,
            U256::from(1u64),
            U256::ZERO,
            vec![Address::ZERO, Address::ZERO],
            Address::ZERO,
            U256::from(1_700_000_000u64),
        );
        assert_eq!(
            data[..4],
            keccak256("swapExactETHForTokens(uint256,address[],address,uint256)")[..4]
        );
    }
}
