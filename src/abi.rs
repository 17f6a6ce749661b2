//! Contract bindings for the subset of the protocol surface the position flow touches.

#[allow(clippy::too_many_arguments)]
pub mod core_proxy {
    alloy::sol!(
        /// Core proxy of the protocol: collateral custody, delegation to pools and
        /// stablecoin issuance.
        #[derive(Debug, PartialEq, Eq)]
        #[sol(rpc)]
        interface ICoreProxy {
            error AccountNotFound(uint128 accountId);
            error PermissionDenied(uint128 accountId, bytes32 permission, address target);
            error InsufficientAccountCollateral(uint256 amount);
            error InsufficientAllowance(uint256 required, uint256 existing);
            error InsufficientCollateralRatio(uint256 collateralValue, uint256 debt, uint256 ratio, uint256 minRatio);
            error InsufficientDelegation(uint256 minDelegation);
            error InvalidCollateralAmount();
            error PoolNotFound(uint128 poolId);

            function deposit(uint128 accountId, address collateralType, uint256 tokenAmount) external;
            function withdraw(uint128 accountId, address collateralType, uint256 tokenAmount) external;
            function delegateCollateral(
                uint128 accountId,
                uint128 poolId,
                address collateralType,
                uint256 newCollateralAmountD18,
                uint256 leverage
            ) external;
            function mintUsd(uint128 accountId, uint128 poolId, address collateralType, uint256 amount) external;
            function burnUsd(uint128 accountId, uint128 poolId, address collateralType, uint256 amount) external;
            function multicall(bytes[] calldata data) external payable returns (bytes[] memory results);
        }
    );
}

pub mod erc20 {
    alloy::sol!(
        #[derive(Debug)]
        #[sol(rpc)]
        interface IERC20 {
            function approve(address spender, uint256 amount) external returns (bool);
            function allowance(address owner, address spender) external view returns (uint256);
            function balanceOf(address account) external view returns (uint256);
        }
    );
}

pub mod weth {
    alloy::sol!(
        /// Wrapped representation of the chain's native currency.
        #[derive(Debug)]
        #[sol(rpc)]
        interface IWETH {
            function deposit() external payable;
            function withdraw(uint256 wad) external;
            function balanceOf(address account) external view returns (uint256);
        }
    );
}
