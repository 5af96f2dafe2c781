//! Reference token standards expressed as required-fragment tables

use std::fmt;
use std::str::FromStr;

use crate::{Abi, AbiError};

const ERC20: &[&str] = &[
    "function totalSupply() view returns (uint256)",
    "function balanceOf(address account) view returns (uint256)",
    "function transfer(address to, uint256 amount) returns (bool)",
    "function allowance(address owner, address spender) view returns (uint256)",
    "function approve(address spender, uint256 amount) returns (bool)",
    "function transferFrom(address from, address to, uint256 amount) returns (bool)",
    "event Transfer(address indexed from, address indexed to, uint256 value)",
    "event Approval(address indexed owner, address indexed spender, uint256 value)",
];

const ERC721: &[&str] = &[
    "function balanceOf(address owner) view returns (uint256)",
    "function ownerOf(uint256 tokenId) view returns (address)",
    "function safeTransferFrom(address from, address to, uint256 tokenId, bytes data)",
    "function safeTransferFrom(address from, address to, uint256 tokenId)",
    "function transferFrom(address from, address to, uint256 tokenId)",
    "function approve(address to, uint256 tokenId)",
    "function setApprovalForAll(address operator, bool approved)",
    "function getApproved(uint256 tokenId) view returns (address)",
    "function isApprovedForAll(address owner, address operator) view returns (bool)",
    "function supportsInterface(bytes4 interfaceId) view returns (bool)",
    "event Transfer(address indexed from, address indexed to, uint256 indexed tokenId)",
    "event Approval(address indexed owner, address indexed approved, uint256 indexed tokenId)",
    "event ApprovalForAll(address indexed owner, address indexed operator, bool approved)",
];

const ERC1155: &[&str] = &[
    "function balanceOf(address account, uint256 id) view returns (uint256)",
    "function balanceOfBatch(address[] accounts, uint256[] ids) view returns (uint256[])",
    "function setApprovalForAll(address operator, bool approved)",
    "function isApprovedForAll(address account, address operator) view returns (bool)",
    "function safeTransferFrom(address from, address to, uint256 id, uint256 amount, bytes data)",
    "function safeBatchTransferFrom(address from, address to, uint256[] ids, uint256[] amounts, bytes data)",
    "function supportsInterface(bytes4 interfaceId) view returns (bool)",
    "event TransferSingle(address indexed operator, address indexed from, address indexed to, uint256 id, uint256 value)",
    "event TransferBatch(address indexed operator, address indexed from, address indexed to, uint256[] ids, uint256[] values)",
    "event ApprovalForAll(address indexed account, address indexed operator, bool approved)",
    "event URI(string value, uint256 indexed id)",
];

/// Token standard a contract session can be checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Standard {
    /// Fungible token
    Erc20,
    /// Non-fungible token
    Erc721,
    /// Multi token
    Erc1155,
}

impl Standard {
    /// Human-readable declarations the standard requires
    pub fn declarations(&self) -> &'static [&'static str] {
        match self {
            Standard::Erc20 => ERC20,
            Standard::Erc721 => ERC721,
            Standard::Erc1155 => ERC1155,
        }
    }

    /// Required fragments as an ABI
    pub fn abi(&self) -> Result<Abi, AbiError> {
        Abi::from_human_readable(self.declarations())
    }
}

impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Standard::Erc20 => "ERC-20",
            Standard::Erc721 => "ERC-721",
            Standard::Erc1155 => "ERC-1155",
        })
    }
}

impl FromStr for Standard {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "erc20" => Ok(Standard::Erc20),
            "erc721" => Ok(Standard::Erc721),
            "erc1155" => Ok(Standard::Erc1155),
            other => Err(AbiError::Parse(format!("Unknown standard: {}", other))),
        }
    }
}
